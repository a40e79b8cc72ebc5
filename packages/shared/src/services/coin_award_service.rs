use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::models::award::{AwardCommit, AwardOutcome, AwardableRecord, CommitOutcome};
use crate::repositories::award_repository::AwardRepository;
use crate::repositories::game_repository::GameRepository;
use crate::repositories::user_repository::UserRepository;
use crate::services::award_guard::should_award;
use crate::services::errors::award_service_errors::{AwardError, MissingReference};
use crate::services::reward_policy::compute_reward;

/// Credits club coins when a booking is confirmed or an offline booking is
/// settled, at most once per record.
#[derive(Clone)]
pub struct CoinAwardService {
    games: Arc<dyn GameRepository + Send + Sync>,
    users: Arc<dyn UserRepository + Send + Sync>,
    awards: Arc<dyn AwardRepository + Send + Sync>,
}

impl CoinAwardService {
    pub fn new(
        games: Arc<dyn GameRepository + Send + Sync>,
        users: Arc<dyn UserRepository + Send + Sync>,
        awards: Arc<dyn AwardRepository + Send + Sync>,
    ) -> Self {
        CoinAwardService {
            games,
            users,
            awards,
        }
    }

    /// Safe to call any number of times, concurrently, with stale images:
    /// the store-side condition on `coinsAwarded` decides the single winner.
    pub async fn reconcile<R>(
        &self,
        previous: Option<&R>,
        current: &R,
    ) -> Result<AwardOutcome, AwardError>
    where
        R: AwardableRecord + Sync,
    {
        if !should_award(previous, current) {
            return Ok(if current.coins_awarded() {
                AwardOutcome::AlreadyAwarded
            } else {
                AwardOutcome::NotQualifying
            });
        }

        let kind = current.kind();
        let record_id = current.id();

        // Empty keys are rejected by the store; they can never resolve.
        if current.game_id().is_empty() {
            error!(%kind, record_id, "Cannot award coins: record has no game id");
            return Err(AwardError::ReferenceNotFound(MissingReference::Game(
                String::new(),
            )));
        }
        if current.mobile().is_empty() {
            error!(%kind, record_id, "Cannot award coins: record has no mobile");
            return Err(AwardError::ReferenceNotFound(MissingReference::User(
                String::new(),
            )));
        }

        let game = match self.games.get_game(current.game_id()).await? {
            Some(game) => game,
            None => {
                error!(
                    %kind,
                    record_id,
                    game_id = current.game_id(),
                    "Cannot award coins: game not found"
                );
                return Err(AwardError::ReferenceNotFound(MissingReference::Game(
                    current.game_id().to_string(),
                )));
            }
        };

        let amount = compute_reward(game.coins, current.duration_hours());

        let user = match self.users.get_user_by_mobile(current.mobile()).await? {
            Some(user) => user,
            None => {
                error!(
                    %kind,
                    record_id,
                    mobile = current.mobile(),
                    "Cannot award coins: no user for mobile"
                );
                return Err(AwardError::ReferenceNotFound(MissingReference::User(
                    current.mobile().to_string(),
                )));
            }
        };

        let commit = AwardCommit {
            kind,
            record_id: record_id.to_string(),
            user_id: user.id.clone(),
            amount,
            awarded_at: Utc::now(),
        };

        match self.awards.commit_award(&commit).await? {
            CommitOutcome::Committed => {
                info!(%kind, record_id, user_id = %user.id, amount, "Awarded club coins");
                Ok(AwardOutcome::Awarded { amount })
            }
            CommitOutcome::AlreadyAwarded => {
                info!(%kind, record_id, "Record already awarded, skipping");
                Ok(AwardOutcome::AlreadyAwarded)
            }
            CommitOutcome::NoLongerQualifying => {
                info!(%kind, record_id, "Stored record no longer qualifies, skipping");
                Ok(AwardOutcome::NotQualifying)
            }
            CommitOutcome::UserMissing => {
                // The user disappeared between lookup and commit.
                warn!(%kind, record_id, user_id = %user.id, "User removed before award commit");
                Err(AwardError::ReferenceNotFound(MissingReference::User(
                    current.mobile().to_string(),
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::booking::{Booking, BookingStatus};
    use crate::models::game::Game;
    use crate::models::offline_booking::{OfflineBooking, Settlement};
    use crate::models::user::User;
    use crate::repositories::award_repository::MockAwardRepository;
    use crate::repositories::errors::award_repository_errors::AwardRepositoryError;
    use crate::repositories::game_repository::MockGameRepository;
    use crate::repositories::memory::InMemoryStore;
    use crate::repositories::user_repository::MockUserRepository;

    const MOBILE: &str = "9876543210";

    struct Fixture {
        store: Arc<InMemoryStore>,
        service: CoinAwardService,
        game: Game,
        user: User,
    }

    fn fixture(coins_per_hour: f64) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let game = Game::new("Snooker", coins_per_hour);
        let user = User::new(MOBILE, "Asha");
        store.insert_game(game.clone());
        store.insert_user(user.clone());
        let service = CoinAwardService::new(store.clone(), store.clone(), store.clone());
        Fixture {
            store,
            service,
            game,
            user,
        }
    }

    fn confirmed_booking(fixture: &Fixture, hours: f64) -> Booking {
        let mut booking = Booking::new(MOBILE, &fixture.game.id, hours);
        booking.status = BookingStatus::Confirmed;
        fixture.store.insert_booking(booking.clone());
        booking
    }

    fn balance(fixture: &Fixture) -> u64 {
        fixture.store.user(&fixture.user.id).unwrap().club_coins
    }

    #[tokio::test]
    async fn test_confirmed_booking_awards_rate_times_duration() {
        let fixture = fixture(10.0);
        let booking = confirmed_booking(&fixture, 2.0);

        let outcome = fixture.service.reconcile(None, &booking).await.unwrap();

        assert_eq!(outcome, AwardOutcome::Awarded { amount: 20 });
        assert_eq!(balance(&fixture), 20);
        let stored = fixture.store.booking(&booking.id).unwrap();
        assert!(stored.coins_awarded);
        assert!(stored.coins_awarded_at.is_some());
        assert_eq!(stored.coins_awarded_amount, Some(20));
    }

    #[tokio::test]
    async fn test_settled_offline_booking_awards() {
        let fixture = fixture(5.0);
        let mut booking = OfflineBooking::new("Asha", MOBILE, &fixture.game.id, 1.0);
        booking.settlement = Settlement::Settled;
        fixture.store.insert_offline_booking(booking.clone());

        let outcome = fixture.service.reconcile(None, &booking).await.unwrap();

        assert_eq!(outcome, AwardOutcome::Awarded { amount: 5 });
        assert_eq!(balance(&fixture), 5);
        assert!(fixture.store.offline_booking(&booking.id).unwrap().coins_awarded);
    }

    #[tokio::test]
    async fn test_reconcile_twice_awards_once() {
        let fixture = fixture(10.0);
        let booking = confirmed_booking(&fixture, 1.5);

        let first = fixture.service.reconcile(None, &booking).await.unwrap();
        // Same stale image, as a duplicate stream delivery would carry.
        let second = fixture.service.reconcile(None, &booking).await.unwrap();

        assert!(first.awarded());
        assert_eq!(first.amount(), 15);
        assert!(!second.awarded());
        assert_eq!(second.amount(), 0);
        assert_eq!(balance(&fixture), 15);
        assert_eq!(fixture.store.commit_count(), 1);
    }

    #[tokio::test]
    async fn test_refreshed_image_short_circuits() {
        let fixture = fixture(10.0);
        let booking = confirmed_booking(&fixture, 1.0);
        fixture.service.reconcile(None, &booking).await.unwrap();

        let refreshed = fixture.store.booking(&booking.id).unwrap();
        let outcome = fixture
            .service
            .reconcile(Some(&booking), &refreshed)
            .await
            .unwrap();

        assert_eq!(outcome, AwardOutcome::AlreadyAwarded);
        assert_eq!(fixture.store.commit_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reconciles_award_exactly_once() {
        let fixture = fixture(10.0);
        let booking = confirmed_booking(&fixture, 2.0);
        let service = Arc::new(fixture.service.clone());

        let mut handles = Vec::new();
        for _ in 0..32 {
            let service = service.clone();
            let booking = booking.clone();
            handles.push(tokio::spawn(async move {
                service.reconcile(None, &booking).await
            }));
        }

        let mut awarded = 0;
        for handle in handles {
            let outcome = handle.await.unwrap().unwrap();
            if outcome.awarded() {
                awarded += 1;
            } else {
                assert_eq!(outcome, AwardOutcome::AlreadyAwarded);
            }
        }

        assert_eq!(awarded, 1);
        assert_eq!(balance(&fixture), 20);
        assert_eq!(fixture.store.commit_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_awards_for_same_user_all_land() {
        let fixture = fixture(10.0);
        let bookings: Vec<Booking> = (0..10).map(|_| confirmed_booking(&fixture, 1.0)).collect();
        let service = Arc::new(fixture.service.clone());

        let handles: Vec<_> = bookings
            .into_iter()
            .map(|booking| {
                let service = service.clone();
                tokio::spawn(async move { service.reconcile(None, &booking).await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().unwrap().awarded());
        }

        assert_eq!(balance(&fixture), 100);
    }

    #[tokio::test]
    async fn test_missing_game_is_reference_not_found() {
        let fixture = fixture(10.0);
        let mut booking = Booking::new(MOBILE, "no-such-game", 2.0);
        booking.status = BookingStatus::Confirmed;
        fixture.store.insert_booking(booking.clone());

        let err = fixture.service.reconcile(None, &booking).await.unwrap_err();

        match err {
            AwardError::ReferenceNotFound(MissingReference::Game(id)) => {
                assert_eq!(id, "no-such-game")
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!fixture.store.booking(&booking.id).unwrap().coins_awarded);
        assert_eq!(balance(&fixture), 0);
    }

    #[tokio::test]
    async fn test_missing_user_is_reference_not_found() {
        let fixture = fixture(10.0);
        let mut booking = Booking::new("9111111111", &fixture.game.id, 2.0);
        booking.status = BookingStatus::Confirmed;
        fixture.store.insert_booking(booking.clone());

        let err = fixture.service.reconcile(None, &booking).await.unwrap_err();

        assert!(matches!(
            err,
            AwardError::ReferenceNotFound(MissingReference::User(ref mobile)) if mobile == "9111111111"
        ));
        assert!(!fixture.store.booking(&booking.id).unwrap().coins_awarded);
        assert_eq!(fixture.store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_pending_booking_never_awards() {
        let fixture = fixture(10.0);
        let booking = Booking::new(MOBILE, &fixture.game.id, 3.0);
        fixture.store.insert_booking(booking.clone());

        let outcome = fixture.service.reconcile(None, &booking).await.unwrap();

        assert_eq!(outcome, AwardOutcome::NotQualifying);
        assert_eq!(balance(&fixture), 0);
        assert!(!fixture.store.booking(&booking.id).unwrap().coins_awarded);
    }

    #[tokio::test]
    async fn test_store_unavailable_leaves_state_untouched() {
        let fixture = fixture(10.0);
        let booking = confirmed_booking(&fixture, 2.0);
        fixture.store.set_unavailable(true);

        let err = fixture.service.reconcile(None, &booking).await.unwrap_err();
        assert!(matches!(err, AwardError::StoreUnavailable(_)));

        fixture.store.set_unavailable(false);
        assert!(!fixture.store.booking(&booking.id).unwrap().coins_awarded);
        assert_eq!(balance(&fixture), 0);
    }

    #[tokio::test]
    async fn test_game_without_rate_awards_zero_and_marks_record() {
        let fixture = fixture(10.0);
        let mut game = Game::new("Free play", 0.0);
        game.coins = None;
        fixture.store.insert_game(game.clone());
        let mut booking = Booking::new(MOBILE, &game.id, 2.0);
        booking.status = BookingStatus::Confirmed;
        fixture.store.insert_booking(booking.clone());

        let outcome = fixture.service.reconcile(None, &booking).await.unwrap();

        assert_eq!(outcome, AwardOutcome::Awarded { amount: 0 });
        assert!(fixture.store.booking(&booking.id).unwrap().coins_awarded);
        assert_eq!(balance(&fixture), 0);
    }

    #[tokio::test]
    async fn test_editing_duration_after_award_does_not_adjust_balance() {
        let fixture = fixture(10.0);
        let booking = confirmed_booking(&fixture, 1.0);
        fixture.service.reconcile(None, &booking).await.unwrap();

        let mut edited = fixture.store.booking(&booking.id).unwrap();
        edited.session_duration = Some(5.0);
        fixture.store.insert_booking(edited.clone());
        let outcome = fixture.service.reconcile(None, &edited).await.unwrap();

        assert_eq!(outcome, AwardOutcome::AlreadyAwarded);
        assert_eq!(balance(&fixture), 10);
        assert_eq!(
            fixture.store.booking(&booking.id).unwrap().coins_awarded_amount,
            Some(10)
        );
    }

    fn confirmed(game_id: &str) -> Booking {
        let mut booking = Booking::new(MOBILE, game_id, 2.0);
        booking.status = BookingStatus::Confirmed;
        booking
    }

    fn mocked_service(awards: MockAwardRepository) -> (CoinAwardService, Booking) {
        let game = Game::new("Carrom", 10.0);
        let user = User::new(MOBILE, "Asha");
        let booking = confirmed(&game.id);

        let mut games = MockGameRepository::new();
        games
            .expect_get_game()
            .times(1)
            .returning(move |_| Ok(Some(game.clone())));
        let mut users = MockUserRepository::new();
        users
            .expect_get_user_by_mobile()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));

        (
            CoinAwardService::new(Arc::new(games), Arc::new(users), Arc::new(awards)),
            booking,
        )
    }

    #[tokio::test]
    async fn test_commit_carries_computed_amount_and_user() {
        let mut awards = MockAwardRepository::new();
        awards
            .expect_commit_award()
            .withf(|commit: &AwardCommit| commit.amount == 20 && !commit.user_id.is_empty())
            .times(1)
            .returning(|_| Ok(CommitOutcome::Committed));
        let (service, booking) = mocked_service(awards);

        let outcome = service.reconcile(None, &booking).await.unwrap();

        assert_eq!(outcome, AwardOutcome::Awarded { amount: 20 });
    }

    #[tokio::test]
    async fn test_lost_race_is_a_no_op() {
        let mut awards = MockAwardRepository::new();
        awards
            .expect_commit_award()
            .times(1)
            .returning(|_| Ok(CommitOutcome::AlreadyAwarded));
        let (service, booking) = mocked_service(awards);

        let outcome = service.reconcile(None, &booking).await.unwrap();

        assert_eq!(outcome, AwardOutcome::AlreadyAwarded);
    }

    #[tokio::test]
    async fn test_user_deleted_before_commit_is_reference_not_found() {
        let mut awards = MockAwardRepository::new();
        awards
            .expect_commit_award()
            .times(1)
            .returning(|_| Ok(CommitOutcome::UserMissing));
        let (service, booking) = mocked_service(awards);

        let err = service.reconcile(None, &booking).await.unwrap_err();

        assert!(matches!(
            err,
            AwardError::ReferenceNotFound(MissingReference::User(_))
        ));
    }

    #[tokio::test]
    async fn test_contended_transaction_is_transient() {
        let mut awards = MockAwardRepository::new();
        awards
            .expect_commit_award()
            .times(1)
            .returning(|_| Err(AwardRepositoryError::Contended("TransactionConflict".into())));
        let (service, booking) = mocked_service(awards);

        let err = service.reconcile(None, &booking).await.unwrap_err();

        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_not_qualifying_never_touches_store() {
        let games = MockGameRepository::new();
        let users = MockUserRepository::new();
        let awards = MockAwardRepository::new();
        let service = CoinAwardService::new(Arc::new(games), Arc::new(users), Arc::new(awards));
        let mut booking = confirmed("game-1");
        booking.status = BookingStatus::Cancelled;

        let outcome = service.reconcile(None, &booking).await.unwrap();

        assert_eq!(outcome, AwardOutcome::NotQualifying);
    }

    #[tokio::test]
    async fn test_record_changed_before_commit_is_not_qualifying() {
        let mut awards = MockAwardRepository::new();
        awards
            .expect_commit_award()
            .times(1)
            .returning(|_| Ok(CommitOutcome::NoLongerQualifying));
        let (service, booking) = mocked_service(awards);

        let outcome = service.reconcile(None, &booking).await.unwrap();

        assert_eq!(outcome, AwardOutcome::NotQualifying);
    }

    #[tokio::test]
    async fn test_booking_cancelled_after_confirmation_is_not_awarded() {
        let fixture = fixture(10.0);
        let booking = confirmed_booking(&fixture, 2.0);
        let mut cancelled = booking.clone();
        cancelled.status = BookingStatus::Cancelled;
        fixture.store.insert_booking(cancelled);

        // The delivered image is the stale confirmed one.
        let outcome = fixture.service.reconcile(None, &booking).await.unwrap();

        assert_eq!(outcome, AwardOutcome::NotQualifying);
        assert_eq!(balance(&fixture), 0);
        assert!(!fixture.store.booking(&booking.id).unwrap().coins_awarded);
    }

    fn service_without_store_calls() -> CoinAwardService {
        let mut games = MockGameRepository::new();
        games.expect_get_game().times(0);
        let mut users = MockUserRepository::new();
        users.expect_get_user_by_mobile().times(0);
        users.expect_get_user_by_id().times(0);
        let mut awards = MockAwardRepository::new();
        awards.expect_commit_award().times(0);
        CoinAwardService::new(Arc::new(games), Arc::new(users), Arc::new(awards))
    }

    #[tokio::test]
    async fn test_empty_game_id_is_reference_not_found() {
        let service = service_without_store_calls();
        let booking = confirmed("");

        let err = service.reconcile(None, &booking).await.unwrap_err();

        assert!(!err.is_transient());
        assert!(matches!(
            err,
            AwardError::ReferenceNotFound(MissingReference::Game(ref id)) if id.is_empty()
        ));
    }

    #[tokio::test]
    async fn test_empty_mobile_is_reference_not_found() {
        let service = service_without_store_calls();
        let mut booking = OfflineBooking::new("Walk-in", "", "game-1", 1.0);
        booking.settlement = Settlement::Settled;

        let err = service.reconcile(None, &booking).await.unwrap_err();

        assert!(!err.is_transient());
        assert!(matches!(
            err,
            AwardError::ReferenceNotFound(MissingReference::User(ref mobile)) if mobile.is_empty()
        ));
    }
}
