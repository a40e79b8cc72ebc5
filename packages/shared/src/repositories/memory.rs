//! In-memory implementation of every repository trait, for tests.
//!
//! `commit_award` performs the same compare-and-set the DynamoDB transaction
//! does, under one lock, so concurrent reconciliations race the way they
//! would against the real store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::models::award::{AwardCommit, AwardableRecord, CommitOutcome, RecordKind};
use crate::models::booking::Booking;
use crate::models::game::Game;
use crate::models::offline_booking::OfflineBooking;
use crate::models::user::User;
use crate::repositories::award_repository::AwardRepository;
use crate::repositories::booking_repository::BookingRepository;
use crate::repositories::errors::award_repository_errors::AwardRepositoryError;
use crate::repositories::errors::booking_repository_errors::BookingRepositoryError;
use crate::repositories::errors::game_repository_errors::GameRepositoryError;
use crate::repositories::errors::user_repository_errors::UserRepositoryError;
use crate::repositories::game_repository::GameRepository;
use crate::repositories::offline_booking_repository::OfflineBookingRepository;
use crate::repositories::user_repository::UserRepository;

#[derive(Default)]
struct State {
    games: HashMap<String, Game>,
    users: HashMap<String, User>,
    bookings: HashMap<String, Booking>,
    offline_bookings: HashMap<String, OfflineBooking>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    unavailable: AtomicBool,
    commits: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_game(&self, game: Game) {
        self.lock().games.insert(game.id.clone(), game);
    }

    pub fn remove_game(&self, game_id: &str) {
        self.lock().games.remove(game_id);
    }

    pub fn insert_user(&self, user: User) {
        self.lock().users.insert(user.id.clone(), user);
    }

    pub fn insert_booking(&self, booking: Booking) {
        self.lock().bookings.insert(booking.id.clone(), booking);
    }

    pub fn insert_offline_booking(&self, booking: OfflineBooking) {
        self.lock()
            .offline_bookings
            .insert(booking.id.clone(), booking);
    }

    pub fn booking(&self, booking_id: &str) -> Option<Booking> {
        self.lock().bookings.get(booking_id).cloned()
    }

    pub fn offline_booking(&self, booking_id: &str) -> Option<OfflineBooking> {
        self.lock().offline_bookings.get(booking_id).cloned()
    }

    pub fn user(&self, user_id: &str) -> Option<User> {
        self.lock().users.get(user_id).cloned()
    }

    /// Makes every call fail as if the store could not be reached.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of award transactions that actually committed.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A panicking test thread must not hide the state from the others.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(&self) -> Result<(), String> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err("store unavailable".to_string())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl GameRepository for InMemoryStore {
    async fn get_game(&self, game_id: &str) -> Result<Option<Game>, GameRepositoryError> {
        self.check_available().map_err(GameRepositoryError::DynamoDb)?;
        Ok(self.lock().games.get(game_id).cloned())
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn get_user_by_id(&self, user_id: &str) -> Result<Option<User>, UserRepositoryError> {
        self.check_available().map_err(UserRepositoryError::DynamoDb)?;
        Ok(self.lock().users.get(user_id).cloned())
    }

    async fn get_user_by_mobile(&self, mobile: &str) -> Result<Option<User>, UserRepositoryError> {
        self.check_available().map_err(UserRepositoryError::DynamoDb)?;
        Ok(self
            .lock()
            .users
            .values()
            .find(|user| user.mobile == mobile)
            .cloned())
    }
}

#[async_trait]
impl BookingRepository for InMemoryStore {
    async fn list_unawarded_confirmed(&self) -> Result<Vec<Booking>, BookingRepositoryError> {
        self.check_available()
            .map_err(BookingRepositoryError::DynamoDb)?;
        let mut bookings: Vec<Booking> = self
            .lock()
            .bookings
            .values()
            .filter(|booking| booking.is_qualifying() && !booking.coins_awarded)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(bookings)
    }
}

#[async_trait]
impl OfflineBookingRepository for InMemoryStore {
    async fn list_unawarded_settled(&self) -> Result<Vec<OfflineBooking>, BookingRepositoryError> {
        self.check_available()
            .map_err(BookingRepositoryError::DynamoDb)?;
        let mut bookings: Vec<OfflineBooking> = self
            .lock()
            .offline_bookings
            .values()
            .filter(|booking| booking.is_qualifying() && !booking.coins_awarded)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(bookings)
    }
}

#[async_trait]
impl AwardRepository for InMemoryStore {
    async fn commit_award(
        &self,
        commit: &AwardCommit,
    ) -> Result<CommitOutcome, AwardRepositoryError> {
        self.check_available().map_err(AwardRepositoryError::DynamoDb)?;
        let mut state = self.lock();

        let record_state = match commit.kind {
            RecordKind::Booking => state
                .bookings
                .get(&commit.record_id)
                .map(|booking| (booking.is_qualifying(), booking.coins_awarded)),
            RecordKind::OfflineBooking => state
                .offline_bookings
                .get(&commit.record_id)
                .map(|booking| (booking.is_qualifying(), booking.coins_awarded)),
        };
        match record_state {
            Some((_, true)) => return Ok(CommitOutcome::AlreadyAwarded),
            Some((true, false)) => {}
            _ => return Ok(CommitOutcome::NoLongerQualifying),
        }

        let Some(user) = state.users.get_mut(&commit.user_id) else {
            return Ok(CommitOutcome::UserMissing);
        };
        user.club_coins = user.club_coins.saturating_add(commit.amount);

        match commit.kind {
            RecordKind::Booking => {
                if let Some(booking) = state.bookings.get_mut(&commit.record_id) {
                    booking.coins_awarded = true;
                    booking.coins_awarded_at = Some(commit.awarded_at);
                    booking.coins_awarded_amount = Some(commit.amount);
                }
            }
            RecordKind::OfflineBooking => {
                if let Some(booking) = state.offline_bookings.get_mut(&commit.record_id) {
                    booking.coins_awarded = true;
                    booking.coins_awarded_at = Some(commit.awarded_at);
                    booking.coins_awarded_amount = Some(commit.amount);
                }
            }
        }

        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(CommitOutcome::Committed)
    }
}
