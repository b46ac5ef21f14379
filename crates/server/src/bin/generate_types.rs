//! Writes the TypeScript declarations the dashboard and site front end
//! compile against.

use std::{env, fs, path::PathBuf};

use ts_rs::TS;

fn declarations() -> Vec<String> {
    vec![
        db::models::locale::Locale::decl(),
        db::models::table::ContentTable::decl(),
        db::models::translation::LocalizedEntry::decl(),
        db::models::post::PostStatus::decl(),
        db::models::post::Post::decl(),
        db::models::post::PostTranslation::decl(),
        db::models::post::PostTranslationInput::decl(),
        db::models::post_category::PostCategory::decl(),
        db::models::post_category::PostCategoryTranslation::decl(),
        db::models::post_category::CategoryTranslationInput::decl(),
        db::models::practice::Practice::decl(),
        db::models::practice::PracticeTranslation::decl(),
        db::models::service::Service::decl(),
        db::models::service::ServiceTranslation::decl(),
        db::models::news_banner::NewsBanner::decl(),
        db::models::team::TeamMember::decl(),
        db::models::team::TeamTranslation::decl(),
        db::models::profile::ProfileRole::decl(),
        db::models::profile::Profile::decl(),
        db::models::access_request::AccessRequestStatus::decl(),
        db::models::access_request::AccessRequest::decl(),
        db::models::access_request::CreateAccessRequest::decl(),
        services::services::listing::SortKey::decl(),
        services::services::listing::Pagination::decl(),
        services::services::category_tree::CategoryLabel::decl(),
        services::services::category_tree::CategoryNode::decl(),
        services::services::news::PostListing::decl(),
        services::services::news::PostDetail::decl(),
        services::services::directory::PracticeListing::decl(),
        services::services::directory::PracticeDetail::decl(),
        services::services::directory::ServiceListing::decl(),
        services::services::directory::BannerView::decl(),
        services::services::directory::TeamMemberView::decl(),
        services::services::storage::ImageUpload::decl(),
        services::services::form_validation::FieldError::decl(),
        services::services::form_validation::ValidationErrors::decl(),
        services::services::post_admin::PostForm::decl(),
        services::services::post_admin::PostRecord::decl(),
        services::services::category_admin::CategoryForm::decl(),
        services::services::category_admin::CategoryRecord::decl(),
        services::services::practice_admin::PracticeForm::decl(),
        services::services::practice_admin::PracticeRecord::decl(),
        services::services::service_admin::ServiceForm::decl(),
        services::services::service_admin::ServiceRecord::decl(),
        services::services::banner_admin::BannerForm::decl(),
        services::services::user_admin::ApproveRequest::decl(),
        services::services::events::ChangeOp::decl(),
        services::services::events::RowChange::decl(),
        services::services::revalidation::RevalidateRequest::decl(),
        services::services::revalidation::RevalidateOutcome::decl(),
        services::services::schema_check::SchemaReport::decl(),
        server::routes::admin::drafts::DraftCount::decl(),
        server::routes::admin::users::RoleChange::decl(),
        utils::response::ApiResponse::<()>::decl(),
    ]
}

fn main() -> std::io::Result<()> {
    let out = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("shared/types.ts"));

    let mut file = String::from("// Generated by `cargo run --bin generate_types`. Do not edit.\n\n");
    for decl in declarations() {
        file.push_str("export ");
        file.push_str(&decl);
        file.push_str("\n\n");
    }

    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&out, file)?;
    println!("Wrote {}", out.display());
    Ok(())
}
