//! Dashboard users and the public access-request queue.

use db::models::{
    access_request::{AccessRequest, AccessRequestStatus, CreateAccessRequest},
    profile::{Profile, ProfileRole},
    table::ContentTable,
};
use serde::Deserialize;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use super::{
    admin::{AdminContext, AdminError},
    events::ChangeOp,
    form_validation::ValidationErrors,
    saga::Compensation,
};

/// Role granted on approval when the reviewer does not pick one.
pub const DEFAULT_APPROVED_ROLE: ProfileRole = ProfileRole::Editor;

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct ApproveRequest {
    pub role: Option<ProfileRole>,
}

#[derive(Clone)]
pub struct UserAdmin {
    ctx: AdminContext,
}

impl UserAdmin {
    pub fn new(ctx: AdminContext) -> Self {
        Self { ctx }
    }

    pub async fn profiles(&self) -> Result<Vec<Profile>, AdminError> {
        Ok(Profile::find_all(&self.ctx.pool).await?)
    }

    async fn profile(&self, id: Uuid) -> Result<Profile, AdminError> {
        Profile::find_by_id(&self.ctx.pool, id)
            .await?
            .ok_or_else(|| AdminError::not_found("profile", id))
    }

    fn last_admin(profile: &Profile) -> AdminError {
        AdminError::Conflict(format!("{} is the last admin", profile.email))
    }

    pub async fn set_role(&self, id: Uuid, role: ProfileRole) -> Result<Profile, AdminError> {
        let profile = self.profile(id).await?;
        let Some(updated) = Profile::set_role(&self.ctx.pool, id, role).await? else {
            // Either deleted in the meantime or refused as the last admin.
            self.profile(id).await?;
            return Err(Self::last_admin(&profile));
        };
        info!(profile_id = %id, from = %profile.role, to = %role, "Profile role changed");
        self.ctx.notify(ContentTable::Profiles, ChangeOp::Update, id);
        Ok(updated)
    }

    pub async fn delete_profile(&self, id: Uuid) -> Result<(), AdminError> {
        let profile = self.profile(id).await?;
        if Profile::delete_unless_last_admin(&self.ctx.pool, id).await? == 0 {
            self.profile(id).await?;
            return Err(Self::last_admin(&profile));
        }
        info!(profile_id = %id, "Profile deleted");
        self.ctx.notify(ContentTable::Profiles, ChangeOp::Delete, id);
        Ok(())
    }

    /// Public entry point. One pending request per email, and none for
    /// addresses that already have a profile.
    pub async fn submit_request(
        &self,
        data: CreateAccessRequest,
    ) -> Result<AccessRequest, AdminError> {
        let mut errors = ValidationErrors::new();
        errors.check_email("email", &data.email);
        errors.into_result()?;

        let email = data.email.trim();
        let pool = &self.ctx.pool;
        if Profile::find_by_email(pool, email).await?.is_some() {
            return Err(AdminError::Conflict(format!("{email} already has access")));
        }
        if AccessRequest::find_pending_by_email(pool, email).await?.is_some() {
            return Err(AdminError::Conflict(format!(
                "a request for {email} is already pending"
            )));
        }

        let request = AccessRequest::create(pool, Uuid::new_v4(), &data)
            .await
            .map_err(|e| match e.as_database_error() {
                Some(db) if db.is_unique_violation() => {
                    AdminError::Conflict(format!("a request for {email} is already pending"))
                }
                _ => AdminError::Database(e),
            })?;
        info!(request_id = %request.id, "Access request submitted");
        self.ctx
            .notify(ContentTable::AccessRequests, ChangeOp::Insert, request.id);
        Ok(request)
    }

    pub async fn requests(
        &self,
        status: Option<AccessRequestStatus>,
    ) -> Result<Vec<AccessRequest>, AdminError> {
        Ok(match status {
            Some(status) => AccessRequest::find_by_status(&self.ctx.pool, status).await?,
            None => AccessRequest::find_all(&self.ctx.pool).await?,
        })
    }

    async fn pending_request(&self, id: Uuid) -> Result<AccessRequest, AdminError> {
        let request = AccessRequest::find_by_id(&self.ctx.pool, id)
            .await?
            .ok_or_else(|| AdminError::not_found("access request", id))?;
        if request.status != AccessRequestStatus::Pending {
            return Err(AdminError::Conflict(format!(
                "request {id} was already {}",
                request.status
            )));
        }
        Ok(request)
    }

    /// Creates the profile, then marks the request approved. A request that
    /// stops being pending in between removes the new profile again.
    pub async fn approve(
        &self,
        id: Uuid,
        approval: ApproveRequest,
    ) -> Result<Profile, AdminError> {
        let request = self.pending_request(id).await?;
        let role = approval.role.unwrap_or(DEFAULT_APPROVED_ROLE);
        let pool = &self.ctx.pool;
        let profile_id = Uuid::new_v4();

        let mut saga = self.ctx.saga("access_request.approve");
        let profile = saga
            .step(
                "insert profile",
                Profile::create(
                    pool,
                    profile_id,
                    &request.email,
                    request.full_name.as_deref(),
                    role,
                ),
            )
            .await?;
        saga.compensate_with(Compensation::DeleteRecord {
            table: ContentTable::Profiles,
            id: profile_id,
        });
        let reviewed = saga
            .step(
                "mark approved",
                AccessRequest::review(pool, id, AccessRequestStatus::Approved),
            )
            .await?;
        if reviewed.is_none() {
            let err = saga.abort("mark approved", "request no longer pending").await;
            return Err(err.into());
        }
        saga.commit().await;

        info!(request_id = %id, profile_id = %profile_id, %role, "Access request approved");
        self.ctx
            .notify(ContentTable::AccessRequests, ChangeOp::Update, id);
        self.ctx
            .notify(ContentTable::Profiles, ChangeOp::Insert, profile_id);
        Ok(profile)
    }

    pub async fn reject(&self, id: Uuid) -> Result<AccessRequest, AdminError> {
        self.pending_request(id).await?;
        let request = AccessRequest::review(&self.ctx.pool, id, AccessRequestStatus::Rejected)
            .await?
            .ok_or_else(|| AdminError::Conflict(format!("request {id} was already reviewed")))?;
        info!(request_id = %id, "Access request rejected");
        self.ctx
            .notify(ContentTable::AccessRequests, ChangeOp::Update, id);
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::admin::test_support::{block, context};

    fn request(email: &str) -> CreateAccessRequest {
        CreateAccessRequest {
            email: email.to_string(),
            full_name: Some("Ada Byron".into()),
            message: None,
        }
    }

    #[tokio::test]
    async fn submit_rejects_bad_and_duplicate_emails() {
        let (ctx, _) = context().await;
        let admin = UserAdmin::new(ctx);
        assert!(matches!(
            admin.submit_request(request("not-an-email")).await,
            Err(AdminError::Validation(_))
        ));

        admin.submit_request(request("ada@example.com")).await.unwrap();
        assert!(matches!(
            admin.submit_request(request(" ada@example.com ")).await,
            Err(AdminError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn approve_creates_editor_and_closes_request() {
        let (ctx, _) = context().await;
        let admin = UserAdmin::new(ctx);
        let submitted = admin.submit_request(request("ada@example.com")).await.unwrap();

        let profile = admin
            .approve(submitted.id, ApproveRequest::default())
            .await
            .unwrap();
        assert_eq!(profile.role, ProfileRole::Editor);
        assert_eq!(profile.email, "ada@example.com");

        let pending = admin.requests(Some(AccessRequestStatus::Pending)).await.unwrap();
        assert!(pending.is_empty());
        assert!(matches!(
            admin.approve(submitted.id, ApproveRequest::default()).await,
            Err(AdminError::Conflict(_))
        ));
        assert!(matches!(
            admin.submit_request(request("ada@example.com")).await,
            Err(AdminError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn failed_status_update_removes_new_profile() {
        let (ctx, _) = context().await;
        let admin = UserAdmin::new(ctx.clone());
        let submitted = admin.submit_request(request("ada@example.com")).await.unwrap();

        block(&ctx.pool, "UPDATE", "access_requests", "1").await;
        let err = admin
            .approve(submitted.id, ApproveRequest::default())
            .await
            .unwrap_err();
        let AdminError::Saga(saga) = err else {
            panic!("expected saga failure, got {err:?}");
        };
        assert!(saga.compensation_failures().is_empty());
        assert!(admin.profiles().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn last_admin_cannot_be_demoted_or_deleted() {
        let (ctx, _) = context().await;
        let pool = ctx.pool.clone();
        let admin = UserAdmin::new(ctx);
        let first = Profile::create(&pool, Uuid::new_v4(), "a@example.com", None, ProfileRole::Admin)
            .await
            .unwrap();

        assert!(matches!(
            admin.set_role(first.id, ProfileRole::Viewer).await,
            Err(AdminError::Conflict(_))
        ));
        assert!(matches!(
            admin.delete_profile(first.id).await,
            Err(AdminError::Conflict(_))
        ));

        let second = Profile::create(&pool, Uuid::new_v4(), "b@example.com", None, ProfileRole::Editor)
            .await
            .unwrap();
        admin.set_role(second.id, ProfileRole::Admin).await.unwrap();
        let demoted = admin.set_role(first.id, ProfileRole::Viewer).await.unwrap();
        assert_eq!(demoted.role, ProfileRole::Viewer);
        admin.delete_profile(first.id).await.unwrap();
    }

    async fn admins(admin: &UserAdmin) -> usize {
        admin
            .profiles()
            .await
            .unwrap()
            .iter()
            .filter(|p| p.role == ProfileRole::Admin)
            .count()
    }

    #[tokio::test]
    async fn concurrent_demotions_keep_one_admin() {
        let (ctx, _) = context().await;
        let pool = ctx.pool.clone();
        let admin = UserAdmin::new(ctx);
        let a = Profile::create(&pool, Uuid::new_v4(), "a@example.com", None, ProfileRole::Admin)
            .await
            .unwrap();
        let b = Profile::create(&pool, Uuid::new_v4(), "b@example.com", None, ProfileRole::Admin)
            .await
            .unwrap();

        let (ra, rb) = tokio::join!(
            admin.set_role(a.id, ProfileRole::Viewer),
            admin.set_role(b.id, ProfileRole::Viewer)
        );
        assert_eq!(ra.is_ok() as u8 + rb.is_ok() as u8, 1);
        assert!(matches!(ra.err().or(rb.err()), Some(AdminError::Conflict(_))));
        assert_eq!(admins(&admin).await, 1);
    }

    #[tokio::test]
    async fn concurrent_deletes_keep_one_admin() {
        let (ctx, _) = context().await;
        let pool = ctx.pool.clone();
        let admin = UserAdmin::new(ctx);
        let a = Profile::create(&pool, Uuid::new_v4(), "a@example.com", None, ProfileRole::Admin)
            .await
            .unwrap();
        let b = Profile::create(&pool, Uuid::new_v4(), "b@example.com", None, ProfileRole::Admin)
            .await
            .unwrap();

        let (ra, rb) = tokio::join!(admin.delete_profile(a.id), admin.delete_profile(b.id));
        assert_eq!(ra.is_ok() as u8 + rb.is_ok() as u8, 1);
        assert_eq!(admins(&admin).await, 1);
        assert!(matches!(
            admin.set_role(Uuid::new_v4(), ProfileRole::Viewer).await,
            Err(AdminError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn concurrent_submits_leave_one_pending_request() {
        let (ctx, _) = context().await;
        let admin = UserAdmin::new(ctx);

        let (ra, rb) = tokio::join!(
            admin.submit_request(request("ada@example.com")),
            admin.submit_request(request("ADA@example.com"))
        );
        assert_eq!(ra.is_ok() as u8 + rb.is_ok() as u8, 1);
        assert!(matches!(ra.err().or(rb.err()), Some(AdminError::Conflict(_))));
        let pending = admin.requests(Some(AccessRequestStatus::Pending)).await.unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn reject_leaves_no_profile() {
        let (ctx, _) = context().await;
        let admin = UserAdmin::new(ctx);
        let submitted = admin.submit_request(request("ada@example.com")).await.unwrap();
        let rejected = admin.reject(submitted.id).await.unwrap();
        assert_eq!(rejected.status, AccessRequestStatus::Rejected);
        assert!(rejected.reviewed_at.is_some());
        assert!(admin.profiles().await.unwrap().is_empty());
    }
}
