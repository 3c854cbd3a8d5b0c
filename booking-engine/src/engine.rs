use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use core_types::{
    BookingKind, CallType, CategoryId, EngineConfig, EntryId, MentorId, PackageId, RetryPolicy,
    SessionId, SlotId, SplitConfig, UserId,
};
use ledger::{LedgerError, LedgerStore, PayoutRequest, SessionDetails};
use log::{error, info, warn};
use pricing::{PriceSource, PricingResolver, Quote};
use session_inventory::{InventoryError, PackageInventory, SessionPackage};
use tokio::time::timeout;

use crate::error::{BookingError, Result};
use crate::rooms::{FallbackRoomProvisioner, Room, RoomProvisioning};
use crate::session::{SessionRecord, SessionStatus, SessionStore};
use crate::slots::SlotBoard;

/// How long an external room provisioner gets before the local fallback
/// takes over.
const ROOM_PROVISION_WINDOW: Duration = Duration::from_millis(100);

/// What the caller wants booked.
#[derive(Debug, Clone)]
pub struct BookingIntent {
    pub user: UserId,
    pub mentor: MentorId,
    pub call_type: CallType,
    pub request: BookingRequest,
}

#[derive(Debug, Clone)]
pub enum BookingRequest {
    /// Start now, for the given duration.
    Instant { minutes: u32 },
    /// Book a published availability slot.
    Slot { slot_id: SlotId },
}

/// A completed booking: the finalized session record, the price that
/// was actually charged, and the payout it produced (absent for
/// zero-cost package sessions).
#[derive(Debug, Clone)]
pub struct BookingConfirmation {
    pub session: SessionRecord,
    pub quote: Quote,
    pub payout: Option<ledger::PayoutEntry>,
}

/// A prepaid package purchase order. Coins for `price` are taken from
/// the user wallet when the order is placed.
#[derive(Debug, Clone)]
pub struct PackageOrder {
    pub user: UserId,
    pub mentor: MentorId,
    pub category: CategoryId,
    pub call_type: CallType,
    pub total_sessions: u32,
    pub price: u64,
    pub duration_minutes: u32,
    pub valid_for: chrono::Duration,
}

/// Undo step recorded as the saga makes progress. Each is idempotent:
/// running one twice (a retry after a partial failure) leaves the same
/// state as running it once.
#[derive(Debug, Clone)]
enum Compensation {
    ReleaseSlot { slot: SlotId, user: UserId },
    ReleasePackage(PackageId),
    ReverseEntry(EntryId),
    CancelSession(SessionId),
}

pub struct BookingEngine {
    ledger: Arc<LedgerStore>,
    inventory: Arc<PackageInventory>,
    resolver: Arc<PricingResolver>,
    slots: Arc<SlotBoard>,
    sessions: Arc<SessionStore>,
    rooms: Arc<dyn RoomProvisioning>,
    fallback: FallbackRoomProvisioner,
    split: SplitConfig,
    rollback: RetryPolicy,
}

impl BookingEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ledger: Arc<LedgerStore>,
        inventory: Arc<PackageInventory>,
        resolver: Arc<PricingResolver>,
        slots: Arc<SlotBoard>,
        sessions: Arc<SessionStore>,
        rooms: Arc<dyn RoomProvisioning>,
        fallback: FallbackRoomProvisioner,
        config: &EngineConfig,
    ) -> Self {
        Self {
            ledger,
            inventory,
            resolver,
            slots,
            sessions,
            rooms,
            fallback,
            split: config.split.clone(),
            rollback: config.rollback.policy(),
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub async fn book(&self, intent: BookingIntent) -> Result<BookingConfirmation> {
        self.book_at(intent, Utc::now()).await
    }

    /// Runs the whole booking saga against one timestamp. Every ledger
    /// entry, package mutation, and session record from this call
    /// carries the same `now`.
    pub async fn book_at(
        &self,
        intent: BookingIntent,
        now: DateTime<Utc>,
    ) -> Result<BookingConfirmation> {
        let (kind, slot_id, starts_at, minutes) = match &intent.request {
            BookingRequest::Instant { minutes } => (BookingKind::Instant, None, now, *minutes),
            BookingRequest::Slot { slot_id } => {
                let slot = self
                    .slots
                    .get(slot_id)
                    .ok_or_else(|| BookingError::SlotNotFound(slot_id.clone()))?;
                (
                    BookingKind::Slot,
                    Some(slot.id),
                    slot.start_at,
                    slot.duration_minutes,
                )
            }
        };

        let mut compensations = Vec::new();

        // The slot is claimed before any funds move: the loser of a
        // double-book race is turned away without being charged.
        if let Some(slot_id) = &slot_id {
            self.slots.claim(slot_id, &intent.user)?;
            compensations.push(Compensation::ReleaseSlot {
                slot: slot_id.clone(),
                user: intent.user.clone(),
            });
        }

        let result = self
            .run_booking(
                &intent,
                kind,
                slot_id,
                starts_at,
                minutes,
                now,
                &mut compensations,
            )
            .await;

        match result {
            Ok(confirmation) => {
                info!(
                    "[booking] session {} confirmed for {} ({} coins)",
                    confirmation.session.id, intent.user, confirmation.quote.cost
                );
                Ok(confirmation)
            }
            Err(err) => {
                warn!("[booking] rolling back for {}: {err}", intent.user);
                self.compensate(compensations, now).await;
                Err(err)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_booking(
        &self,
        intent: &BookingIntent,
        kind: BookingKind,
        slot_id: Option<SlotId>,
        starts_at: DateTime<Utc>,
        minutes: u32,
        now: DateTime<Utc>,
        compensations: &mut Vec<Compensation>,
    ) -> Result<BookingConfirmation> {
        let session_id = self.sessions.mint_id(&intent.user, &intent.mentor, now);

        let (quote, package) = self
            .secure_funds(intent, minutes, &session_id, now, compensations)
            .await?;

        let room = self.provision_room(&session_id, intent.call_type).await?;

        self.sessions.insert(SessionRecord {
            id: session_id,
            user: intent.user.clone(),
            mentor: intent.mentor.clone(),
            call_type: intent.call_type,
            kind,
            slot: slot_id.clone(),
            duration_minutes: minutes,
            cost: quote.cost,
            package,
            room: Some(room),
            status: SessionStatus::Pending,
            starts_at,
            created_at: now,
        });
        compensations.push(Compensation::CancelSession(session_id));

        let mut payout = None;
        if quote.cost > 0 {
            let (mentor_share, admin_share) = self.split.shares(quote.cost);
            let request = PayoutRequest {
                user: intent.user.clone(),
                mentor: intent.mentor.clone(),
                session: session_id,
                slot: slot_id,
                gross: quote.cost,
                mentor_share,
                admin_share,
                description: format!("payout for session {session_id}"),
                details: SessionDetails {
                    duration_minutes: minutes,
                    call_type: intent.call_type,
                    session_date: starts_at,
                    session_time: starts_at.format("%I:%M %p").to_string(),
                    booking_kind: kind,
                },
            };
            match self.ledger.credit_payout(request, now) {
                Ok((entry, record)) => {
                    compensations.push(Compensation::ReverseEntry(entry.id));
                    payout = Some(record);
                }
                // An earlier attempt already paid this session out.
                Err(LedgerError::DuplicateSessionRef { .. }) => {
                    payout = self.ledger.payout_for_session(&session_id);
                }
                Err(other) => return Err(other.into()),
            }
        }

        let final_status = match kind {
            BookingKind::Instant => SessionStatus::Active,
            BookingKind::Slot => SessionStatus::Scheduled,
        };
        let session = self.sessions.set_status(&session_id, final_status)?;

        Ok(BookingConfirmation {
            session,
            quote,
            payout,
        })
    }

    /// Prices the session and secures its funding: a package credit is
    /// consumed via compare-and-swap, anything else is reserved from the
    /// user wallet. A credit snatched by a concurrent booking triggers
    /// one fresh resolution, then a straight catalog quote.
    async fn secure_funds(
        &self,
        intent: &BookingIntent,
        minutes: u32,
        session_id: &SessionId,
        now: DateTime<Utc>,
        compensations: &mut Vec<Compensation>,
    ) -> Result<(Quote, Option<PackageId>)> {
        let mut quote = self
            .resolver
            .resolve(&intent.user, &intent.mentor, intent.call_type, minutes, now)
            .await?;
        let mut repriced = false;
        loop {
            let PriceSource::Package { id, remaining } = quote.source else {
                break;
            };
            match self.inventory.consume(&id, remaining, now) {
                Ok(_) => {
                    compensations.push(Compensation::ReleasePackage(id));
                    return Ok((quote, Some(id)));
                }
                Err(InventoryError::Conflict { .. }) | Err(InventoryError::NotActive(_)) => {
                    warn!(
                        "[booking] package {id} credit lost to a concurrent booking, repricing"
                    );
                    quote = if repriced {
                        self.resolver
                            .catalog_quote(&intent.user, &intent.mentor, intent.call_type, minutes)
                            .await?
                    } else {
                        repriced = true;
                        self.resolver
                            .resolve(&intent.user, &intent.mentor, intent.call_type, minutes, now)
                            .await?
                    };
                }
                Err(other) => return Err(other.into()),
            }
        }

        if quote.cost > 0 {
            let description = format!("{} session with {}", intent.call_type, intent.mentor);
            let entry = self.ledger.reserve(
                &intent.user,
                quote.cost,
                Some(session_id),
                &description,
                None,
                now,
            )?;
            compensations.push(Compensation::ReverseEntry(entry.id));
        }
        Ok((quote, None))
    }

    /// Asks the configured provisioner for a room, falling back to a
    /// locally minted one if it is too slow. A provisioner error is a
    /// hard failure and rolls the booking back.
    async fn provision_room(&self, session: &SessionId, call_type: CallType) -> Result<Room> {
        match timeout(ROOM_PROVISION_WINDOW, self.rooms.provision(session, call_type)).await {
            Ok(Ok(room)) => Ok(room),
            Ok(Err(err)) => Err(BookingError::Infrastructure(err.to_string())),
            Err(_) => {
                warn!("[booking] room provisioner timed out, using local fallback");
                Ok(self.fallback.make_room(call_type))
            }
        }
    }

    /// Buys a prepaid package: coins out of the user wallet, credits
    /// onto the shelf. If the package cannot be registered the debit is
    /// reversed.
    pub async fn purchase_package(&self, order: PackageOrder) -> Result<SessionPackage> {
        self.purchase_package_at(order, Utc::now()).await
    }

    pub async fn purchase_package_at(
        &self,
        order: PackageOrder,
        now: DateTime<Utc>,
    ) -> Result<SessionPackage> {
        let description = format!(
            "package purchase: {} x {} min {} with {}",
            order.total_sessions, order.duration_minutes, order.call_type, order.mentor
        );
        let entry = if order.price > 0 {
            Some(
                self.ledger
                    .reserve(&order.user, order.price, None, &description, None, now)?,
            )
        } else {
            None
        };

        match self.inventory.purchase(
            order.user,
            order.mentor,
            order.category,
            order.call_type,
            order.total_sessions,
            order.price,
            order.duration_minutes,
            order.valid_for,
            now,
        ) {
            Ok(package) => Ok(package),
            Err(err) => {
                if let Some(entry) = entry {
                    self.compensate(vec![Compensation::ReverseEntry(entry.id)], now)
                        .await;
                }
                Err(err.into())
            }
        }
    }

    pub async fn cancel_session(&self, id: &SessionId) -> Result<SessionRecord> {
        self.cancel_session_at(id, Utc::now()).await
    }

    /// Cancels a booked session: refunds the user debit, claws back the
    /// mentor credit, returns any package credit, and frees the slot.
    /// Repeating a cancellation is a no-op.
    pub async fn cancel_session_at(
        &self,
        id: &SessionId,
        now: DateTime<Utc>,
    ) -> Result<SessionRecord> {
        let record = self
            .sessions
            .get(id)
            .ok_or(BookingError::UnknownSession(*id))?;
        match record.status {
            SessionStatus::Cancelled => return Ok(record),
            SessionStatus::Completed => {
                return Err(BookingError::Infrastructure(format!(
                    "session {id} already completed"
                )))
            }
            _ => {}
        }

        let cancelled = self.sessions.set_status(id, SessionStatus::Cancelled)?;

        let mut compensations = Vec::new();
        if let Some(slot) = &cancelled.slot {
            compensations.push(Compensation::ReleaseSlot {
                slot: slot.clone(),
                user: cancelled.user.clone(),
            });
        }
        if let Some(package) = cancelled.package {
            compensations.push(Compensation::ReleasePackage(package));
        }
        for entry in self.ledger.entries_for_session(id) {
            if entry.status == ledger::EntryStatus::Confirmed {
                compensations.push(Compensation::ReverseEntry(entry.id));
            }
        }
        self.compensate(compensations, now).await;

        info!("[booking] session {id} cancelled");
        Ok(cancelled)
    }

    /// Runs compensations newest-first, each on the rollback retry
    /// policy. A compensation that keeps failing is logged and skipped;
    /// the rest still run.
    async fn compensate(&self, compensations: Vec<Compensation>, now: DateTime<Utc>) {
        for compensation in compensations.into_iter().rev() {
            let outcome = self
                .rollback
                .retry_async(|attempt| {
                    let compensation = compensation.clone();
                    async move {
                        if attempt > 0 {
                            warn!("[rollback] retrying {compensation:?} (attempt {attempt})");
                        }
                        self.apply_compensation(&compensation, now)
                    }
                })
                .await;
            if let Err(err) = outcome {
                error!("[rollback] {compensation:?} failed permanently: {err}");
            }
        }
    }

    fn apply_compensation(&self, compensation: &Compensation, now: DateTime<Utc>) -> Result<()> {
        match compensation {
            Compensation::ReleaseSlot { slot, user } => self.slots.release(slot, user),
            Compensation::ReleasePackage(id) => match self.inventory.release(id, now) {
                Ok(_) | Err(InventoryError::NothingToRelease(_)) => Ok(()),
                Err(other) => Err(other.into()),
            },
            Compensation::ReverseEntry(id) => match self.ledger.reverse(id, now) {
                Ok(_) | Err(LedgerError::AlreadyReversed(_)) => Ok(()),
                Err(other) => Err(other.into()),
            },
            Compensation::CancelSession(id) => {
                self.sessions.set_status(id, SessionStatus::Cancelled)?;
                Ok(())
            }
        }
    }
}
