//! In-memory store
//!
//! All tables live behind one `RwLock`, so every trait method runs as a
//! single critical section and compound writes are atomic.

use async_trait::async_trait;
use chrono::Utc;
use eo_org::{
    normalize_email, Membership, Organisation, OrganisationRole, Publication, PublicationAttachment,
    Subscription, User,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CascadeReport, MembershipUpsert, ProvisionedOrganisation, Store};
use crate::error::{StoreError, StoreResult};
use crate::query::{OrganisationScope, Page, PublicationQuery};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    organisations: HashMap<Uuid, Organisation>,
    /// Keyed by organisation id (1:1)
    subscriptions: HashMap<Uuid, Subscription>,
    memberships: HashMap<Uuid, Membership>,
    publications: HashMap<Uuid, Publication>,
    attachments: HashMap<Uuid, PublicationAttachment>,
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        let key = normalize_email(email);
        self.users
            .values()
            .any(|u| Some(u.id) != except && u.email_key() == key)
    }

    fn slug_taken(&self, slug: &str, except: Option<Uuid>) -> bool {
        self.organisations
            .values()
            .any(|o| Some(o.id) != except && o.slug == slug)
    }

    fn membership_of(&self, user_id: Uuid, organisation_id: Uuid) -> Option<&Membership> {
        self.memberships
            .values()
            .find(|m| m.user_id == user_id && m.organisation_id == organisation_id)
    }

    /// Remove a publication's attachments, returning their storage keys.
    fn remove_attachments_of(&mut self, publication_id: Uuid) -> Vec<String> {
        let ids: Vec<Uuid> = self
            .attachments
            .values()
            .filter(|a| a.publication_id == publication_id)
            .map(|a| a.id)
            .collect();
        ids.into_iter()
            .filter_map(|id| self.attachments.remove(&id))
            .map(|a| a.file)
            .collect()
    }
}

/// Store keeping everything in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> (chrono::DateTime<Utc>, Uuid),
{
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: User) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(&user.email, None) {
            return Err(StoreError::UniqueViolation { field: "email" });
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let key = normalize_email(email);
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email_key() == key).cloned())
    }

    async fn update_user(&self, user: User) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user.id) {
            return Err(StoreError::not_found("user", user.id));
        }
        if tables.email_taken(&user.email, Some(user.id)) {
            return Err(StoreError::UniqueViolation { field: "email" });
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn provision_organisation(
        &self,
        organisation: Organisation,
        subscription: Subscription,
        owner: Option<Membership>,
    ) -> StoreResult<ProvisionedOrganisation> {
        let mut tables = self.tables.write().await;
        if tables.slug_taken(&organisation.slug, Some(organisation.id)) {
            return Err(StoreError::UniqueViolation { field: "slug" });
        }
        if let Some(membership) = &owner {
            if !tables.users.contains_key(&membership.user_id) {
                return Err(StoreError::not_found("user", membership.user_id));
            }
        }

        let organisation_id = organisation.id;
        tables.organisations.insert(organisation_id, organisation.clone());

        let subscription = tables
            .subscriptions
            .entry(organisation_id)
            .or_insert(Subscription {
                organisation_id,
                ..subscription
            })
            .clone();

        let owner = match owner {
            Some(membership) => {
                let existing = tables
                    .membership_of(membership.user_id, organisation_id)
                    .cloned();
                Some(match existing {
                    Some(existing) => existing,
                    None => {
                        let membership = Membership {
                            organisation_id,
                            ..membership
                        };
                        tables.memberships.insert(membership.id, membership.clone());
                        membership
                    }
                })
            }
            None => None,
        };

        Ok(ProvisionedOrganisation {
            organisation,
            subscription,
            owner,
        })
    }

    async fn get_organisation(&self, id: Uuid) -> StoreResult<Option<Organisation>> {
        Ok(self.tables.read().await.organisations.get(&id).cloned())
    }

    async fn get_organisation_by_slug(&self, slug: &str) -> StoreResult<Option<Organisation>> {
        let tables = self.tables.read().await;
        Ok(tables.organisations.values().find(|o| o.slug == slug).cloned())
    }

    async fn update_organisation(&self, organisation: Organisation) -> StoreResult<Organisation> {
        let mut tables = self.tables.write().await;
        if !tables.organisations.contains_key(&organisation.id) {
            return Err(StoreError::not_found("organisation", organisation.id));
        }
        if tables.slug_taken(&organisation.slug, Some(organisation.id)) {
            return Err(StoreError::UniqueViolation { field: "slug" });
        }
        tables.organisations.insert(organisation.id, organisation.clone());
        Ok(organisation)
    }

    async fn delete_organisation(&self, id: Uuid) -> StoreResult<CascadeReport> {
        let mut tables = self.tables.write().await;
        if tables.organisations.remove(&id).is_none() {
            return Err(StoreError::not_found("organisation", id));
        }
        tables.subscriptions.remove(&id);

        let before = tables.memberships.len();
        tables.memberships.retain(|_, m| m.organisation_id != id);
        let memberships = before - tables.memberships.len();

        let publication_ids: Vec<Uuid> = tables
            .publications
            .values()
            .filter(|p| p.organisation_id == id)
            .map(|p| p.id)
            .collect();
        let mut released_files = Vec::new();
        for publication_id in &publication_ids {
            tables.publications.remove(publication_id);
            released_files.extend(tables.remove_attachments_of(*publication_id));
        }

        // Legacy pointer is cleared rather than cascaded
        for user in tables.users.values_mut() {
            if user.organisation_id == Some(id) {
                user.organisation_id = None;
            }
        }

        Ok(CascadeReport {
            publications: publication_ids.len(),
            memberships,
            released_files,
        })
    }

    async fn organisations_of_user(&self, user_id: Uuid) -> StoreResult<Vec<Organisation>> {
        let tables = self.tables.read().await;
        let mut organisations: Vec<Organisation> = tables
            .memberships
            .values()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| tables.organisations.get(&m.organisation_id).cloned())
            .collect();
        organisations.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        organisations.dedup_by_key(|o| o.id);
        Ok(organisations)
    }

    async fn all_organisations(&self) -> StoreResult<Vec<Organisation>> {
        let tables = self.tables.read().await;
        let mut organisations: Vec<Organisation> = tables.organisations.values().cloned().collect();
        organisations.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(organisations)
    }

    async fn get_subscription(&self, organisation_id: Uuid) -> StoreResult<Option<Subscription>> {
        Ok(self.tables.read().await.subscriptions.get(&organisation_id).cloned())
    }

    async fn update_subscription(&self, subscription: Subscription) -> StoreResult<Subscription> {
        let mut tables = self.tables.write().await;
        match tables.subscriptions.get_mut(&subscription.organisation_id) {
            Some(stored) if stored.id == subscription.id => {
                *stored = subscription.clone();
                Ok(subscription)
            }
            _ => Err(StoreError::not_found("subscription", subscription.id)),
        }
    }

    async fn upsert_membership(
        &self,
        organisation_id: Uuid,
        user_id: Uuid,
        role: OrganisationRole,
        invited_by: Option<Uuid>,
    ) -> StoreResult<MembershipUpsert> {
        let mut tables = self.tables.write().await;
        if !tables.organisations.contains_key(&organisation_id) {
            return Err(StoreError::not_found("organisation", organisation_id));
        }
        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::not_found("user", user_id));
        }

        let existing = tables.membership_of(user_id, organisation_id).map(|m| m.id);
        match existing.and_then(|id| tables.memberships.get_mut(&id)) {
            Some(membership) => {
                membership.role = role;
                Ok(MembershipUpsert {
                    membership: membership.clone(),
                    created: false,
                })
            }
            None => {
                let mut membership = Membership::new(organisation_id, user_id, role);
                membership.invited_by = invited_by;
                tables.memberships.insert(membership.id, membership.clone());
                Ok(MembershipUpsert {
                    membership,
                    created: true,
                })
            }
        }
    }

    async fn get_membership(&self, id: Uuid) -> StoreResult<Option<Membership>> {
        Ok(self.tables.read().await.memberships.get(&id).cloned())
    }

    async fn role_of(&self, user_id: Uuid, organisation_id: Uuid) -> StoreResult<Option<OrganisationRole>> {
        let tables = self.tables.read().await;
        Ok(tables.membership_of(user_id, organisation_id).map(|m| m.role))
    }

    async fn memberships_of_user(&self, user_id: Uuid) -> StoreResult<Vec<Membership>> {
        let tables = self.tables.read().await;
        Ok(tables
            .memberships
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn memberships_in(&self, organisation_ids: &[Uuid]) -> StoreResult<Vec<Membership>> {
        let tables = self.tables.read().await;
        let mut memberships: Vec<Membership> = tables
            .memberships
            .values()
            .filter(|m| organisation_ids.contains(&m.organisation_id))
            .cloned()
            .collect();
        newest_first(&mut memberships, |m| (m.created_at, m.id));
        Ok(memberships)
    }

    async fn update_membership(&self, membership: Membership) -> StoreResult<Membership> {
        let mut tables = self.tables.write().await;
        match tables.memberships.get_mut(&membership.id) {
            Some(stored) => {
                // Only the role is mutable
                stored.role = membership.role;
                Ok(stored.clone())
            }
            None => Err(StoreError::not_found("membership", membership.id)),
        }
    }

    async fn delete_membership(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .memberships
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("membership", id))
    }

    async fn insert_publication(&self, publication: Publication) -> StoreResult<Publication> {
        let mut tables = self.tables.write().await;
        if !tables.organisations.contains_key(&publication.organisation_id) {
            return Err(StoreError::not_found("organisation", publication.organisation_id));
        }
        tables.publications.insert(publication.id, publication.clone());
        Ok(publication)
    }

    async fn get_publication(&self, id: Uuid) -> StoreResult<Option<Publication>> {
        Ok(self.tables.read().await.publications.get(&id).cloned())
    }

    async fn update_publication(&self, publication: Publication) -> StoreResult<Publication> {
        let mut tables = self.tables.write().await;
        match tables.publications.get_mut(&publication.id) {
            Some(stored) => {
                *stored = publication.clone();
                Ok(publication)
            }
            None => Err(StoreError::not_found("publication", publication.id)),
        }
    }

    async fn delete_publication(&self, id: Uuid) -> StoreResult<CascadeReport> {
        let mut tables = self.tables.write().await;
        if tables.publications.remove(&id).is_none() {
            return Err(StoreError::not_found("publication", id));
        }
        Ok(CascadeReport {
            publications: 1,
            memberships: 0,
            released_files: tables.remove_attachments_of(id),
        })
    }

    async fn query_publications(&self, query: &PublicationQuery) -> StoreResult<Page<Publication>> {
        let tables = self.tables.read().await;
        Ok(query.run(tables.publications.values()))
    }

    async fn visible_publication_ids(&self, scopes: &[OrganisationScope]) -> StoreResult<Vec<Uuid>> {
        let tables = self.tables.read().await;
        Ok(tables
            .publications
            .values()
            .filter(|p| scopes.iter().any(|scope| scope.admits(p)))
            .map(|p| p.id)
            .collect())
    }

    async fn insert_attachment(&self, attachment: PublicationAttachment) -> StoreResult<PublicationAttachment> {
        let mut tables = self.tables.write().await;
        if !tables.publications.contains_key(&attachment.publication_id) {
            return Err(StoreError::not_found("publication", attachment.publication_id));
        }
        tables.attachments.insert(attachment.id, attachment.clone());
        Ok(attachment)
    }

    async fn get_attachment(&self, id: Uuid) -> StoreResult<Option<PublicationAttachment>> {
        Ok(self.tables.read().await.attachments.get(&id).cloned())
    }

    async fn update_attachment(&self, attachment: PublicationAttachment) -> StoreResult<PublicationAttachment> {
        let mut tables = self.tables.write().await;
        match tables.attachments.get_mut(&attachment.id) {
            Some(stored) => {
                *stored = attachment.clone();
                Ok(attachment)
            }
            None => Err(StoreError::not_found("attachment", attachment.id)),
        }
    }

    async fn delete_attachment(&self, id: Uuid) -> StoreResult<PublicationAttachment> {
        let mut tables = self.tables.write().await;
        tables
            .attachments
            .remove(&id)
            .ok_or_else(|| StoreError::not_found("attachment", id))
    }

    async fn attachments_of(&self, publication_ids: &[Uuid]) -> StoreResult<Vec<PublicationAttachment>> {
        let tables = self.tables.read().await;
        let mut attachments: Vec<PublicationAttachment> = tables
            .attachments
            .values()
            .filter(|a| publication_ids.contains(&a.publication_id))
            .cloned()
            .collect();
        newest_first(&mut attachments, |a| (a.created_at, a.id));
        Ok(attachments)
    }

    async fn count_attachments(&self, publication_id: Uuid) -> StoreResult<usize> {
        let tables = self.tables.read().await;
        Ok(tables
            .attachments
            .values()
            .filter(|a| a.publication_id == publication_id)
            .count())
    }
}
