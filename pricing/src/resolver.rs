use std::sync::Arc;

use chrono::{DateTime, Utc};
use core_types::{CallType, MentorId, OwnerId, PackageId, PricingConfig, UserId};
use ledger::{Direction, EntryStatus, LedgerStore};
use log::debug;
use session_inventory::PackageInventory;

use crate::catalog::MentorCatalog;
use crate::error::{PricingError, Result};

/// Which purse covers a quoted session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSource {
    /// Covered by a prepaid package credit. `remaining` is the credit
    /// count observed at quote time, used as the compare-and-swap
    /// expectation when the credit is actually consumed.
    Package { id: PackageId, remaining: u32 },
    /// Charged from the user wallet at the mentor's published rate.
    Catalog { rate_per_minute: u64 },
    /// Charged at the flat first-chat price.
    FirstSession,
}

/// A priced booking: how many coins move, and from where. `cost` is the
/// gross amount; the mentor/admin split is applied downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub cost: u64,
    pub source: PriceSource,
}

pub struct PricingResolver {
    catalog: Arc<dyn MentorCatalog>,
    inventory: Arc<PackageInventory>,
    ledger: Arc<LedgerStore>,
    config: PricingConfig,
}

impl PricingResolver {
    pub fn new(
        catalog: Arc<dyn MentorCatalog>,
        inventory: Arc<PackageInventory>,
        ledger: Arc<LedgerStore>,
        config: PricingConfig,
    ) -> Self {
        Self {
            catalog,
            inventory,
            ledger,
            config,
        }
    }

    /// Prices one session. Package credits win over everything; the
    /// flat first-chat price applies only when enabled and the user has
    /// never paid for a session before.
    pub async fn resolve(
        &self,
        user: &UserId,
        mentor: &MentorId,
        call_type: CallType,
        minutes: u32,
        now: DateTime<Utc>,
    ) -> Result<Quote> {
        if let Some(package) = self.inventory.find_consumable(user, mentor, call_type, now) {
            debug!(
                "[pricing] {user} covered by package {} ({} credits left)",
                package.id, package.remaining_sessions
            );
            return Ok(Quote {
                cost: 0,
                source: PriceSource::Package {
                    id: package.id,
                    remaining: package.remaining_sessions,
                },
            });
        }

        if call_type == CallType::Chat {
            if let Some(flat) = self.config.first_session_flat {
                if self.is_first_session(user) {
                    debug!("[pricing] first chat session for {user}, flat price {flat}");
                    return Ok(Quote {
                        cost: flat,
                        source: PriceSource::FirstSession,
                    });
                }
            }
        }

        self.catalog_quote(user, mentor, call_type, minutes).await
    }

    /// Prices straight from the catalog, skipping packages. Used when a
    /// quoted package credit was snatched by a concurrent booking.
    pub async fn catalog_quote(
        &self,
        user: &UserId,
        mentor: &MentorId,
        call_type: CallType,
        minutes: u32,
    ) -> Result<Quote> {
        let rate = self
            .catalog
            .rate_per_minute(mentor, call_type)
            .await
            .ok_or_else(|| PricingError::Unavailable {
                mentor: mentor.clone(),
                call_type,
            })?;
        let cost = rate
            .checked_mul(minutes as u64)
            .ok_or(PricingError::CostOverflow { rate, minutes })?;
        debug!("[pricing] {user} quoted {cost} ({rate}/min x {minutes} min)");
        Ok(Quote {
            cost,
            source: PriceSource::Catalog {
                rate_per_minute: rate,
            },
        })
    }

    /// A user is on their first session until a confirmed session debit
    /// exists in their ledger history. Refunded debits from rolled-back
    /// bookings do not count.
    fn is_first_session(&self, user: &UserId) -> bool {
        let owner = OwnerId::User(user.clone());
        !self.ledger.history(&owner).iter().any(|entry| {
            entry.direction == Direction::Debit
                && entry.status == EntryStatus::Confirmed
                && entry.session.is_some()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use chrono::Duration;
    use core_types::uid::session_uid;
    use core_types::{CategoryId, SessionId};

    struct Fixture {
        catalog: Arc<StaticCatalog>,
        inventory: Arc<PackageInventory>,
        ledger: Arc<LedgerStore>,
    }

    fn fixture(config: PricingConfig) -> (Fixture, PricingResolver) {
        let catalog = Arc::new(StaticCatalog::new());
        let inventory = Arc::new(PackageInventory::new());
        let ledger = Arc::new(LedgerStore::new());
        let resolver = PricingResolver::new(
            catalog.clone() as Arc<dyn MentorCatalog>,
            inventory.clone(),
            ledger.clone(),
            config,
        );
        (
            Fixture {
                catalog,
                inventory,
                ledger,
            },
            resolver,
        )
    }

    #[tokio::test]
    async fn rate_times_minutes() {
        let (fx, resolver) = fixture(PricingConfig::default());
        let mentor = MentorId::from("m-1");
        fx.catalog.set_rate(mentor.clone(), CallType::Video, 10);

        let quote = resolver
            .resolve(&UserId::from("u-1"), &mentor, CallType::Video, 5, Utc::now())
            .await
            .unwrap();
        assert_eq!(quote.cost, 50);
        assert_eq!(
            quote.source,
            PriceSource::Catalog {
                rate_per_minute: 10
            }
        );
    }

    #[tokio::test]
    async fn missing_rate_is_unavailable_not_free() {
        let (_fx, resolver) = fixture(PricingConfig::default());
        let err = resolver
            .resolve(
                &UserId::from("u-1"),
                &MentorId::from("m-1"),
                CallType::Audio,
                5,
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PricingError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn package_credit_prices_at_zero() {
        let (fx, resolver) = fixture(PricingConfig::default());
        let user = UserId::from("u-1");
        let mentor = MentorId::from("m-1");
        fx.catalog.set_rate(mentor.clone(), CallType::Video, 10);
        let package = fx
            .inventory
            .purchase(
                user.clone(),
                mentor.clone(),
                CategoryId::from("career"),
                CallType::Video,
                3,
                150,
                30,
                Duration::days(30),
                Utc::now(),
            )
            .unwrap();

        let quote = resolver
            .resolve(&user, &mentor, CallType::Video, 30, Utc::now())
            .await
            .unwrap();
        assert_eq!(quote.cost, 0);
        assert_eq!(
            quote.source,
            PriceSource::Package {
                id: package.id,
                remaining: 3
            }
        );
    }

    #[tokio::test]
    async fn first_chat_flat_applies_exactly_once() {
        let (fx, resolver) = fixture(PricingConfig {
            first_session_flat: Some(1),
        });
        let user = UserId::from("u-1");
        let mentor = MentorId::from("m-1");
        fx.catalog.set_rate(mentor.clone(), CallType::Chat, 4);

        let quote = resolver
            .resolve(&user, &mentor, CallType::Chat, 10, Utc::now())
            .await
            .unwrap();
        assert_eq!(quote.cost, 1);
        assert_eq!(quote.source, PriceSource::FirstSession);

        // A confirmed session debit ends first-session status.
        let owner = OwnerId::User(user.clone());
        fx.ledger
            .credit(&owner, 100, None, "seed", None, Utc::now())
            .unwrap();
        let session = SessionId::from_uid(session_uid("u-1", "m-1", 0, 1));
        fx.ledger
            .reserve(&user, 1, Some(&session), "first chat", None, Utc::now())
            .unwrap();

        let quote = resolver
            .resolve(&user, &mentor, CallType::Chat, 10, Utc::now())
            .await
            .unwrap();
        assert_eq!(quote.cost, 40);
    }

    #[tokio::test]
    async fn flat_price_never_applies_to_calls() {
        let (fx, resolver) = fixture(PricingConfig {
            first_session_flat: Some(1),
        });
        let mentor = MentorId::from("m-1");
        fx.catalog.set_rate(mentor.clone(), CallType::Video, 10);

        let quote = resolver
            .resolve(&UserId::from("u-1"), &mentor, CallType::Video, 5, Utc::now())
            .await
            .unwrap();
        assert_eq!(quote.cost, 50);
    }
}
