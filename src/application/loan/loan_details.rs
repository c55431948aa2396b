use std::collections::HashMap;

use crate::application::ServiceDependencies;
use crate::domain::{
    book::Book,
    loan::Loan,
    member::Member,
    value_objects::{BookId, MemberId},
};

use super::errors::Result;

/// 会員・書籍を添えた貸出
///
/// 外部キーがあるため通常はどちらも存在するが、読み取りの間に削除された場合は`None`。
#[derive(Debug, Clone, PartialEq)]
pub struct LoanDetails {
    pub loan: Loan,
    pub member: Option<Member>,
    pub book: Option<Book>,
}

/// 添付する関連データ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanIncludes {
    /// 会員と書籍
    MemberAndBook,
    /// 書籍のみ（会員の貸出履歴用）
    BookOnly,
}

/// 貸出に会員・書籍を添える
///
/// 同じ会員・書籍は一度だけ読み込む。
pub async fn with_details(
    deps: &ServiceDependencies,
    loans: Vec<Loan>,
    includes: LoanIncludes,
) -> Result<Vec<LoanDetails>> {
    let mut members: HashMap<MemberId, Option<Member>> = HashMap::new();
    let mut books: HashMap<BookId, Option<Book>> = HashMap::new();
    let mut details = Vec::with_capacity(loans.len());

    for loan in loans {
        let member = match includes {
            LoanIncludes::MemberAndBook => {
                if !members.contains_key(&loan.member_id) {
                    let found = deps.members.find_by_id(loan.member_id).await?;
                    members.insert(loan.member_id, found);
                }
                members.get(&loan.member_id).cloned().flatten()
            }
            LoanIncludes::BookOnly => None,
        };

        if !books.contains_key(&loan.book_id) {
            let found = deps.books.find_by_id(loan.book_id).await?;
            books.insert(loan.book_id, found);
        }
        let book = books.get(&loan.book_id).cloned().flatten();

        details.push(LoanDetails { loan, member, book });
    }

    Ok(details)
}

/// 1件の貸出に会員・書籍を添える
pub async fn loan_details(deps: &ServiceDependencies, loan: Loan) -> Result<LoanDetails> {
    let (member, book) = futures::try_join!(
        deps.members.find_by_id(loan.member_id),
        deps.books.find_by_id(loan.book_id),
    )?;

    Ok(LoanDetails { loan, member, book })
}
