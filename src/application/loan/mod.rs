mod errors;
mod loan_details;
mod loan_service;
mod overdue_detection;

pub use errors::{LoanApplicationError, LoanErrorKind, Result};
pub use loan_details::{LoanDetails, LoanIncludes, loan_details, with_details};
pub use loan_service::{
    borrow_book, can_borrow, eligibility, get_loan, list_loans, list_member_loans, return_loan,
};
pub use overdue_detection::{list_overdue, mark_overdue};
