use crate::domain::book::{Book, BookFilter};
use crate::domain::loan::{Loan, LoanStatus};
use crate::domain::member::Member;
use crate::domain::reservation::{Reservation, ReservationStatus};
use crate::domain::value_objects::{BookId, LoanId, MemberId, ReservationId};
use crate::ports::{
    BookRepository, LoanFilter, LoanRepository, LoanSort, LoanUpdate, MemberRepository,
    RepositoryError, ReservationRepository, Result,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct State {
    members: HashMap<MemberId, Member>,
    books: HashMap<BookId, Book>,
    loans: HashMap<LoanId, Loan>,
    reservations: HashMap<ReservationId, Reservation>,
}

impl State {
    fn has_unreturned_loan(&self, book_id: BookId) -> bool {
        self.loans
            .values()
            .any(|l| l.book_id == book_id && l.returned_at.is_none())
    }

    /// 読み出し用：貸出可否を貸出記録から導出して返す
    fn book_view(&self, book: &Book) -> Book {
        Book {
            available: !self.has_unreturned_loan(book.book_id),
            ..book.clone()
        }
    }
}

/// 全リポジトリポートのインメモリ実装
///
/// 1つのMutexで全テーブルを保護するため、各メソッドは原子的に実行される。
/// 貸出と書籍の同時更新も、全て反映されるか何も変わらないかのどちらか。
///
/// PostgreSQLスキーマと同じ制約を持つ：
/// - emailとISBNは一意
/// - 書籍ごとに未返却の貸出は1件まで
/// - 貸出記録のある会員・書籍は削除不可
/// - 予約は会員・書籍の削除に連動して消える
#[derive(Default)]
pub struct InMemoryLibrary {
    state: Mutex<State>,
}

impl InMemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl MemberRepository for InMemoryLibrary {
    async fn find_by_id(&self, member_id: MemberId) -> Result<Option<Member>> {
        Ok(self.state()?.members.get(&member_id).cloned())
    }

    async fn list(&self) -> Result<Vec<Member>> {
        let mut members: Vec<Member> = self.state()?.members.values().cloned().collect();
        members.sort_by(|a, b| b.registered_at.cmp(&a.registered_at));
        Ok(members)
    }

    async fn create(&self, member: &Member) -> Result<()> {
        let mut state = self.state()?;
        if state.members.values().any(|m| m.email == member.email) {
            return Err(RepositoryError::UniqueViolation(
                "members_email_key".to_string(),
            ));
        }
        state.members.insert(member.member_id, member.clone());
        Ok(())
    }

    async fn update(&self, member: &Member) -> Result<()> {
        let mut state = self.state()?;
        if !state.members.contains_key(&member.member_id) {
            return Err(RepositoryError::NotFound);
        }
        if state
            .members
            .values()
            .any(|m| m.member_id != member.member_id && m.email == member.email)
        {
            return Err(RepositoryError::UniqueViolation(
                "members_email_key".to_string(),
            ));
        }
        state.members.insert(member.member_id, member.clone());
        Ok(())
    }

    async fn delete(&self, member_id: MemberId) -> Result<()> {
        let mut state = self.state()?;
        if !state.members.contains_key(&member_id) {
            return Err(RepositoryError::NotFound);
        }
        if state.loans.values().any(|l| l.member_id == member_id) {
            return Err(RepositoryError::ForeignKeyViolation(
                "loans_member_id_fkey".to_string(),
            ));
        }
        state.reservations.retain(|_, r| r.member_id != member_id);
        state.members.remove(&member_id);
        Ok(())
    }

    async fn count(&self, active_only: bool) -> Result<u64> {
        Ok(self
            .state()?
            .members
            .values()
            .filter(|m| !active_only || m.active)
            .count() as u64)
    }
}

#[async_trait]
impl BookRepository for InMemoryLibrary {
    async fn find_by_id(&self, book_id: BookId) -> Result<Option<Book>> {
        let state = self.state()?;
        Ok(state.books.get(&book_id).map(|b| state.book_view(b)))
    }

    async fn list(&self, filter: &BookFilter) -> Result<Vec<Book>> {
        let state = self.state()?;
        let mut books: Vec<Book> = state
            .books
            .values()
            .map(|b| state.book_view(b))
            .filter(|b| filter.matches(b))
            .collect();
        books.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(books)
    }

    async fn search(&self, query: &str) -> Result<Vec<Book>> {
        let state = self.state()?;
        let mut books: Vec<Book> = state
            .books
            .values()
            .filter(|b| b.matches_query(query))
            .map(|b| state.book_view(b))
            .collect();
        books.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(books)
    }

    async fn create(&self, book: &Book) -> Result<()> {
        let mut state = self.state()?;
        if state.books.values().any(|b| b.isbn == book.isbn) {
            return Err(RepositoryError::UniqueViolation("books_isbn_key".to_string()));
        }
        state.books.insert(book.book_id, book.clone());
        Ok(())
    }

    async fn update(&self, book: &Book) -> Result<()> {
        let mut state = self.state()?;
        if state
            .books
            .values()
            .any(|b| b.book_id != book.book_id && b.isbn == book.isbn)
        {
            return Err(RepositoryError::UniqueViolation("books_isbn_key".to_string()));
        }
        let stored = state
            .books
            .get_mut(&book.book_id)
            .ok_or(RepositoryError::NotFound)?;
        // 貸出可否フラグは保持する
        *stored = Book {
            available: stored.available,
            ..book.clone()
        };
        Ok(())
    }

    async fn delete(&self, book_id: BookId) -> Result<()> {
        let mut state = self.state()?;
        if !state.books.contains_key(&book_id) {
            return Err(RepositoryError::NotFound);
        }
        if state.loans.values().any(|l| l.book_id == book_id) {
            return Err(RepositoryError::ForeignKeyViolation(
                "loans_book_id_fkey".to_string(),
            ));
        }
        state.reservations.retain(|_, r| r.book_id != book_id);
        state.books.remove(&book_id);
        Ok(())
    }

    async fn count(&self, available_only: bool) -> Result<u64> {
        let state = self.state()?;
        Ok(state
            .books
            .keys()
            .filter(|id| !available_only || !state.has_unreturned_loan(**id))
            .count() as u64)
    }
}

#[async_trait]
impl LoanRepository for InMemoryLibrary {
    async fn find_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>> {
        Ok(self.state()?.loans.get(&loan_id).cloned())
    }

    async fn count(&self, filter: &LoanFilter) -> Result<u64> {
        Ok(self
            .state()?
            .loans
            .values()
            .filter(|l| filter.matches(l))
            .count() as u64)
    }

    async fn list(&self, filter: &LoanFilter, sort: LoanSort) -> Result<Vec<Loan>> {
        let mut loans: Vec<Loan> = self
            .state()?
            .loans
            .values()
            .filter(|l| filter.matches(l))
            .cloned()
            .collect();
        match sort {
            LoanSort::LoanedAtDesc => loans.sort_by(|a, b| b.loaned_at.cmp(&a.loaned_at)),
            LoanSort::DueDateAsc => loans.sort_by(|a, b| a.due_date.cmp(&b.due_date)),
        }
        Ok(loans)
    }

    async fn create_loan_and_update_book(&self, loan: &Loan, book_available: bool) -> Result<()> {
        let mut state = self.state()?;
        if !state.members.contains_key(&loan.member_id) {
            return Err(RepositoryError::ForeignKeyViolation(
                "loans_member_id_fkey".to_string(),
            ));
        }
        if !state.books.contains_key(&loan.book_id) {
            return Err(RepositoryError::NotFound);
        }
        if loan.returned_at.is_none() && state.has_unreturned_loan(loan.book_id) {
            return Err(RepositoryError::UniqueViolation(
                "loans_one_unreturned_per_book".to_string(),
            ));
        }

        state.loans.insert(loan.loan_id, loan.clone());
        if let Some(book) = state.books.get_mut(&loan.book_id) {
            book.available = book_available;
        }
        Ok(())
    }

    async fn update_loan_and_book(
        &self,
        loan_id: LoanId,
        update: LoanUpdate,
        book_id: BookId,
        book_available: bool,
    ) -> Result<()> {
        let mut state = self.state()?;
        if !state.books.contains_key(&book_id) {
            return Err(RepositoryError::NotFound);
        }
        let loan = state
            .loans
            .get_mut(&loan_id)
            .ok_or(RepositoryError::NotFound)?;
        if loan.returned_at.is_some() {
            return Err(RepositoryError::Conflict);
        }
        loan.status = update.status;
        loan.returned_at = update.returned_at;

        if let Some(book) = state.books.get_mut(&book_id) {
            book.available = book_available;
        }
        Ok(())
    }

    async fn update_many(&self, filter: &LoanFilter, status: LoanStatus) -> Result<u64> {
        let mut state = self.state()?;
        let mut changed = 0;
        for loan in state.loans.values_mut().filter(|l| filter.matches(l)) {
            loan.status = status;
            changed += 1;
        }
        Ok(changed)
    }
}

#[async_trait]
impl ReservationRepository for InMemoryLibrary {
    async fn find_by_id(&self, reservation_id: ReservationId) -> Result<Option<Reservation>> {
        Ok(self.state()?.reservations.get(&reservation_id).cloned())
    }

    async fn list(&self, status: Option<ReservationStatus>) -> Result<Vec<Reservation>> {
        let mut reservations: Vec<Reservation> = self
            .state()?
            .reservations
            .values()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        reservations.sort_by(|a, b| b.reserved_at.cmp(&a.reserved_at));
        Ok(reservations)
    }

    async fn create(&self, reservation: &Reservation) -> Result<()> {
        let mut state = self.state()?;
        if !state.members.contains_key(&reservation.member_id)
            || !state.books.contains_key(&reservation.book_id)
        {
            return Err(RepositoryError::ForeignKeyViolation(
                "reservations_fkey".to_string(),
            ));
        }
        state
            .reservations
            .insert(reservation.reservation_id, reservation.clone());
        Ok(())
    }

    async fn update_status(
        &self,
        reservation_id: ReservationId,
        status: ReservationStatus,
    ) -> Result<()> {
        let mut state = self.state()?;
        let reservation = state
            .reservations
            .get_mut(&reservation_id)
            .ok_or(RepositoryError::NotFound)?;
        reservation.status = status;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::book::NewBook;
    use crate::domain::loan::{LoanPolicy, open_loan};
    use crate::domain::member::NewMember;
    use chrono::Utc;

    fn member(email: &str) -> Member {
        Member::register(
            NewMember {
                last_name: "Dupont".to_string(),
                first_name: "Marie".to_string(),
                email: email.to_string(),
                phone: None,
            },
            Utc::now(),
        )
    }

    fn book(isbn: &str) -> Book {
        Book::catalog(NewBook {
            title: "1984".to_string(),
            isbn: isbn.to_string(),
            author: "George Orwell".to_string(),
            publisher: None,
            publication_year: None,
            category: Some("Science-fiction".to_string()),
        })
    }

    #[tokio::test]
    async fn test_duplicate_email_is_unique_violation() {
        let store = InMemoryLibrary::new();
        MemberRepository::create(&store, &member("a@example.com"))
            .await
            .unwrap();

        let result = MemberRepository::create(&store, &member("a@example.com")).await;
        assert!(matches!(result, Err(RepositoryError::UniqueViolation(_))));
    }

    #[tokio::test]
    async fn test_second_unreturned_loan_for_book_is_rejected() {
        let store = InMemoryLibrary::new();
        let m = member("a@example.com");
        let b = book("978-0-452-28423-4");
        MemberRepository::create(&store, &m).await.unwrap();
        BookRepository::create(&store, &b).await.unwrap();

        let policy = LoanPolicy::default();
        let first = open_loan(m.member_id, b.book_id, Utc::now(), &policy);
        let second = open_loan(m.member_id, b.book_id, Utc::now(), &policy);

        store.create_loan_and_update_book(&first, false).await.unwrap();
        let result = store.create_loan_and_update_book(&second, false).await;

        assert!(matches!(result, Err(RepositoryError::UniqueViolation(_))));
        assert_eq!(LoanRepository::count(&store, &LoanFilter::default()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_book_availability_is_derived_from_loans() {
        let store = InMemoryLibrary::new();
        let m = member("a@example.com");
        let b = book("978-0-452-28423-4");
        MemberRepository::create(&store, &m).await.unwrap();
        BookRepository::create(&store, &b).await.unwrap();

        let loan = open_loan(m.member_id, b.book_id, Utc::now(), &LoanPolicy::default());
        // フラグを書き換えずに貸出だけ作っても、読み出しは貸出中になる
        store.create_loan_and_update_book(&loan, true).await.unwrap();

        let read = BookRepository::find_by_id(&store, b.book_id)
            .await
            .unwrap()
            .unwrap();
        assert!(!read.available);
        assert_eq!(BookRepository::count(&store, true).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_of_returned_loan_is_conflict() {
        let store = InMemoryLibrary::new();
        let m = member("a@example.com");
        let b = book("978-0-452-28423-4");
        MemberRepository::create(&store, &m).await.unwrap();
        BookRepository::create(&store, &b).await.unwrap();
        let loan = open_loan(m.member_id, b.book_id, Utc::now(), &LoanPolicy::default());
        store.create_loan_and_update_book(&loan, false).await.unwrap();

        let now = Utc::now();
        store
            .update_loan_and_book(loan.loan_id, LoanUpdate::returned(now), b.book_id, true)
            .await
            .unwrap();
        let again = store
            .update_loan_and_book(loan.loan_id, LoanUpdate::returned(now), b.book_id, true)
            .await;

        assert!(matches!(again, Err(RepositoryError::Conflict)));
    }

    #[tokio::test]
    async fn test_member_with_loans_cannot_be_deleted() {
        let store = InMemoryLibrary::new();
        let m = member("a@example.com");
        let b = book("978-0-452-28423-4");
        MemberRepository::create(&store, &m).await.unwrap();
        BookRepository::create(&store, &b).await.unwrap();
        let loan = open_loan(m.member_id, b.book_id, Utc::now(), &LoanPolicy::default());
        store.create_loan_and_update_book(&loan, false).await.unwrap();

        let result = MemberRepository::delete(&store, m.member_id).await;
        assert!(matches!(result, Err(RepositoryError::ForeignKeyViolation(_))));
    }
}
