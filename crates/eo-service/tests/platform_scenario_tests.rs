//! End-to-end scenarios over the in-memory platform.
//!
//! These tests drive the wired [`Platform`] the way an outer transport would:
//! sign users up, resolve their tokens to principals, then exercise the
//! organisation, membership and publication flows against a temporary media
//! directory.
//!
//! Scenarios:
//! 1. Organisation creation provisions the owner membership and the trial
//! 2. Member promotion unlocks publishing; drafts stay hidden from members
//! 3. Event schedule validation
//! 4. Organisation deletion cascades and releases stored files
//! 5. Non-members see nothing of a foreign organisation

use chrono::{Duration, TimeZone, Utc};
use eo_org::{
    NewOrganisation, NewPublication, OrganisationRole, PublicationPatch, PublicationStatus, SubscriptionStatus,
};
use eo_rbac::Principal;
use eo_service::{
    EoConfig, InviteMembership, LoginRequest, NewAttachment, OrganisationRef, Platform,
    PublicationFilter, ServiceError, SignupRequest, Upload,
};
use tempfile::TempDir;

/// Test fixture holding a platform and its media directory.
struct TestFixture {
    platform: Platform,
    /// Kept alive for the duration of the test.
    media: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let media = tempfile::tempdir().expect("temp dir");
        let config = EoConfig {
            jwt_secret: Some("scenario-secret-scenario-secret-32".to_string()),
            media_root: media.path().to_path_buf(),
            page_size: 10,
            ..Default::default()
        };
        let platform = Platform::in_memory(&config).await.expect("platform");
        Self { platform, media }
    }

    /// Sign up, log in and resolve the access token.
    async fn user(&self, email: &str) -> Principal {
        let users = &self.platform.users;
        users
            .signup(SignupRequest {
                email: email.to_string(),
                password: "correct horse battery".to_string(),
            })
            .await
            .expect("signup");
        let pair = users
            .authenticate(LoginRequest {
                email: email.to_string(),
                password: "correct horse battery".to_string(),
            })
            .await
            .expect("login");
        users.resolve(&pair.access_token).await.expect("resolve")
    }

    async fn organisation(&self, owner: &Principal, name: &str, trial_days: u32) -> String {
        self.platform
            .organisations
            .create(owner, NewOrganisation::named(name).with_trial_days(trial_days))
            .await
            .expect("create organisation")
            .organisation
            .slug
    }

    async fn invite(&self, caller: &Principal, slug: &str, email: &str, role: OrganisationRole) {
        let organisation = self
            .platform
            .organisations
            .retrieve_by_slug(caller, slug)
            .await
            .expect("organisation");
        self.platform
            .memberships
            .invite(caller, InviteMembership::new(organisation.organisation.id, email, role))
            .await
            .expect("invite");
    }

    async fn visible_titles(&self, caller: &Principal) -> Vec<String> {
        self.platform
            .publications
            .list(caller, PublicationFilter::default())
            .await
            .expect("list")
            .results
            .into_iter()
            .map(|p| p.title)
            .collect()
    }
}

#[tokio::test]
async fn test_creation_provisions_owner_and_trial() {
    let fx = TestFixture::new().await;
    let owner = fx.user("owner@example.com").await;

    let before = Utc::now();
    let slug = fx.organisation(&owner, "Acme", 30).await;
    let detail = fx.platform.organisations.retrieve_by_slug(&owner, &slug).await.unwrap();

    let subscription = fx.platform.organisations.get_subscription(&owner, &slug).await.unwrap();
    assert_eq!(subscription.status, SubscriptionStatus::Trialing);
    assert_eq!(
        subscription.trial_end,
        Some(detail.organisation.created_at + Duration::days(30))
    );
    assert!(subscription.trial_end.unwrap() >= before + Duration::days(30));

    let role = fx
        .platform
        .memberships
        .role_of(owner.user_id, detail.organisation.id)
        .await
        .unwrap();
    assert_eq!(role, Some(OrganisationRole::Owner));

    let no_trial = fx.organisation(&owner, "Beta", 0).await;
    let subscription = fx.platform.organisations.get_subscription(&owner, &no_trial).await.unwrap();
    assert!(subscription.trial_end.is_none());
}

#[tokio::test]
async fn test_promotion_unlocks_publishing() {
    let fx = TestFixture::new().await;
    let owner = fx.user("owner@example.com").await;
    let bob = fx.user("bob@example.com").await;
    let carol = fx.user("carol@example.com").await;
    let slug = fx.organisation(&owner, "Acme", 30).await;

    fx.invite(&owner, &slug, "bob@example.com", OrganisationRole::Member).await;
    fx.invite(&owner, &slug, "carol@example.com", OrganisationRole::Member).await;

    let err = fx
        .platform
        .publications
        .create(&bob, NewPublication::information("News", "Body"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::PermissionDenied(_)));

    // Inviting again overwrites the role instead of duplicating the row
    fx.invite(&owner, &slug, "BOB@example.com", OrganisationRole::Admin).await;
    let memberships = fx
        .platform
        .memberships
        .list(&owner, Some(&OrganisationRef::Slug(slug.clone())))
        .await
        .unwrap();
    assert_eq!(memberships.len(), 3);

    let draft = fx
        .platform
        .publications
        .create(&bob, NewPublication::information("News", "Body"))
        .await
        .unwrap();
    assert_eq!(draft.status, PublicationStatus::Draft);
    assert!(!draft.is_published);

    assert_eq!(fx.visible_titles(&bob).await, vec!["News"]);
    assert_eq!(fx.visible_titles(&owner).await, vec!["News"]);
    assert!(fx.visible_titles(&carol).await.is_empty());

    let published = fx
        .platform
        .publications
        .update(&bob, draft.id, PublicationPatch::status(PublicationStatus::Published))
        .await
        .unwrap();
    assert!(published.is_published);
    assert_eq!(fx.visible_titles(&carol).await, vec!["News"]);
}

#[tokio::test]
async fn test_event_schedule_rules() {
    let fx = TestFixture::new().await;
    let owner = fx.user("owner@example.com").await;
    fx.organisation(&owner, "Acme", 30).await;

    let err = fx
        .platform
        .publications
        .create(&owner, NewPublication::event("Fair", "Stalls", None, None))
        .await
        .unwrap_err();
    assert!(err.validation_errors().unwrap().has("event_start"));

    let start = Utc.with_ymd_and_hms(2025, 1, 10, 10, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2025, 1, 9, 10, 0, 0).unwrap();
    let err = fx
        .platform
        .publications
        .create(&owner, NewPublication::event("Fair", "Stalls", Some(start), Some(end)))
        .await
        .unwrap_err();
    assert!(err.validation_errors().unwrap().has("event_end"));

    let event = fx
        .platform
        .publications
        .create(&owner, NewPublication::event("Fair", "Stalls", Some(start), None))
        .await
        .unwrap();
    assert_eq!(event.event_start, Some(start));
}

#[tokio::test]
async fn test_organisation_delete_releases_files() {
    let fx = TestFixture::new().await;
    let owner = fx.user("owner@example.com").await;
    let slug = fx.organisation(&owner, "Acme", 30).await;

    let publication = fx
        .platform
        .publications
        .create(&owner, NewPublication::information("Minutes", "Body"))
        .await
        .unwrap();
    let attachment = fx
        .platform
        .publications
        .add_attachment(
            &owner,
            publication.id,
            NewAttachment::new(Upload::new("minutes.pdf", b"%PDF-1.7".to_vec())),
        )
        .await
        .unwrap();
    assert!(fx.media.path().join(&attachment.file).exists());

    fx.platform.organisations.delete(&owner, &slug).await.unwrap();

    assert!(!fx.media.path().join(&attachment.file).exists());
    assert!(fx.platform.organisations.list_mine(&owner).await.unwrap().is_empty());
    assert!(fx.platform.memberships.current(owner.user_id).await.unwrap().is_none());
    let err = fx.platform.publications.retrieve(&owner, publication.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn test_non_member_sees_nothing() {
    let fx = TestFixture::new().await;
    let owner = fx.user("owner@example.com").await;
    let outsider = fx.user("outsider@example.com").await;
    let slug = fx.organisation(&owner, "Acme", 30).await;

    let publication = fx
        .platform
        .publications
        .create(
            &owner,
            NewPublication::information("Public", "Body").with_status(PublicationStatus::Published),
        )
        .await
        .unwrap();

    assert!(fx.visible_titles(&outsider).await.is_empty());
    assert!(fx.platform.attachments.list(&outsider).await.unwrap().is_empty());
    assert!(fx.platform.memberships.list(&outsider, None).await.unwrap().is_empty());

    let errors = [
        fx.platform.publications.retrieve(&outsider, publication.id).await.unwrap_err(),
        fx.platform
            .publications
            .update(&outsider, publication.id, PublicationPatch::status(PublicationStatus::Archived))
            .await
            .unwrap_err(),
        fx.platform.organisations.get_subscription(&outsider, &slug).await.unwrap_err(),
    ];
    for err in errors {
        assert!(matches!(err, ServiceError::NotFound(_)), "{err}");
    }
}
