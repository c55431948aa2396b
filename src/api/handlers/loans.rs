use crate::application::loan::{self, LoanApplicationError, LoanIncludes};
use crate::domain::{
    commands::ReturnBook,
    loan::Eligibility,
    value_objects::{LoanId, MemberId},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::AppState;
use crate::api::{
    error::ApiError,
    types::{
        BorrowRequest, EligibilityResponse, ListLoansQuery, LoanResponse, SweepResponse,
        parse_loan_status,
    },
};

// ============================================================================
// Command handlers (POST)
// ============================================================================

/// POST /loans - 書籍を貸し出す
///
/// 強制されるビジネスルール:
/// - 会員が存在し、有効であること
/// - 書籍に未返却の貸出がないこと
/// - 会員の貸出数が上限未満であること
/// - 会員に延滞中の貸出がないこと
pub async fn create_loan(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BorrowRequest>,
) -> Result<(StatusCode, Json<LoanResponse>), ApiError> {
    let now = Utc::now();
    let loan = loan::borrow_book(&state.service_deps, req.to_command(now)).await?;
    let details = loan::loan_details(&state.service_deps, loan).await?;

    Ok((
        StatusCode::CREATED,
        Json(LoanResponse::from_details(details, now)),
    ))
}

/// POST /loans/:id/return - 書籍を返却
///
/// 延滞中の貸出も返却できる。返却済みの場合は409。
pub async fn return_loan(
    State(state): State<Arc<AppState>>,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<LoanResponse>, ApiError> {
    let now = Utc::now();
    let cmd = ReturnBook {
        loan_id: LoanId::from_uuid(loan_id),
        returned_at: now,
    };

    let loan = loan::return_loan(&state.service_deps, cmd).await?;
    let details = loan::loan_details(&state.service_deps, loan).await?;

    Ok(Json(LoanResponse::from_details(details, now)))
}

/// POST /loans/overdue/sweep - 期限切れのActiveな貸出をOverdueに更新
pub async fn sweep_overdue(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SweepResponse>, ApiError> {
    let count = loan::mark_overdue(&state.service_deps, Utc::now()).await?;
    Ok(Json(SweepResponse { count }))
}

// ============================================================================
// Query handlers (GET)
// ============================================================================

/// GET /loans - 貸出一覧
///
/// クエリパラメータ:
/// - status: active, overdue, returned（導出ステータスで判定）
/// - member_id: 会員IDでフィルタリング
pub async fn list_loans(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListLoansQuery>,
) -> Result<Json<Vec<LoanResponse>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(parse_loan_status)
        .transpose()
        .map_err(ApiError::BadRequest)?;

    let now = Utc::now();
    let loans = loan::list_loans(
        &state.service_deps,
        status,
        query.member_id.map(MemberId::from_uuid),
        now,
    )
    .await?;
    let details =
        loan::with_details(&state.service_deps, loans, LoanIncludes::MemberAndBook).await?;

    Ok(Json(
        details
            .into_iter()
            .map(|d| LoanResponse::from_details(d, now))
            .collect(),
    ))
}

/// GET /loans/:id - 貸出詳細（会員・書籍を埋め込む）
pub async fn get_loan(
    State(state): State<Arc<AppState>>,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<LoanResponse>, ApiError> {
    let loan = loan::get_loan(&state.service_deps, LoanId::from_uuid(loan_id)).await?;
    let details = loan::loan_details(&state.service_deps, loan).await?;
    Ok(Json(LoanResponse::from_details(details, Utc::now())))
}

/// GET /loans/overdue - 延滞中の貸出（返却期限の古い順）
pub async fn list_overdue(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<LoanResponse>>, ApiError> {
    let now = Utc::now();
    let loans = loan::list_overdue(&state.service_deps, now).await?;
    let details =
        loan::with_details(&state.service_deps, loans, LoanIncludes::MemberAndBook).await?;

    Ok(Json(
        details
            .into_iter()
            .map(|d| LoanResponse::from_details(d, now))
            .collect(),
    ))
}

/// GET /members/:id/loans - 会員の貸出履歴（書籍を埋め込む）
pub async fn list_member_loans(
    State(state): State<Arc<AppState>>,
    Path(member_id): Path<Uuid>,
) -> Result<Json<Vec<LoanResponse>>, ApiError> {
    let now = Utc::now();
    let loans = loan::list_member_loans(&state.service_deps, MemberId::from_uuid(member_id)).await?;
    let details = loan::with_details(&state.service_deps, loans, LoanIncludes::BookOnly).await?;

    Ok(Json(
        details
            .into_iter()
            .map(|d| LoanResponse::from_details(d, now))
            .collect(),
    ))
}

/// GET /members/:id/eligibility - 会員が現在貸出を受けられるか
pub async fn member_eligibility(
    State(state): State<Arc<AppState>>,
    Path(member_id): Path<Uuid>,
) -> Result<Json<EligibilityResponse>, ApiError> {
    let member_id = MemberId::from_uuid(member_id);
    let eligibility = loan::eligibility(&state.service_deps, member_id, Utc::now()).await?;

    if eligibility == Eligibility::UnknownMember {
        return Err(LoanApplicationError::MemberNotFound.into());
    }

    Ok(Json(EligibilityResponse::new(member_id, eligibility)))
}
