use chrono::{Duration as ChronoDuration, Utc};
use std::time::Duration;
use tracing::{info, instrument};

use super::{effect::Offence, player::PlayerId};
use crate::{
    common::privilege::PrivilegeLevel,
    config::PickupConfig,
    db::{
        client::PersistentStore,
        model::{BanOrigin, BanRecord, Counter},
    },
    error::StoreError,
};

/// What [`apply`] ended up doing.
#[derive(Eq, PartialEq, Debug)]
pub enum Verdict {
    Exempt,
    /// Counted against the player, threshold not yet exceeded
    Warned(u32),
    Banned(BanRecord),
}

/// Evaluates an offence against the player's persisted counters, issuing a
/// time-scoped ban once the configured maximum is exceeded.
///
/// No-shows are counted here. Sub usage is counted when the substitution is
/// made, so an [`Offence::ExcessSubs`] only checks the threshold.
#[instrument(skip(store, config))]
pub async fn apply(
    store: &dyn PersistentStore,
    config: &PickupConfig,
    player: &PlayerId,
    offence: Offence,
) -> Result<Verdict, StoreError> {
    let level = if config.owners.contains(player) {
        PrivilegeLevel::Owner
    } else {
        store.privilege_level(player).await?
    };
    if level >= config.exempt_level {
        info!("{} is exempt from pickup punishments", player);
        return Ok(Verdict::Exempt);
    }

    let (count, max, origin, length) = match offence {
        Offence::NoShow => (
            store.increment(player, Counter::NoShows).await?,
            config.max_no_shows,
            BanOrigin::PickupNoShow,
            config.no_show_ban,
        ),
        Offence::ExcessSubs => (
            store.stats(player).await?.subs_used,
            config.max_subs,
            BanOrigin::PickupSub,
            config.sub_ban,
        ),
    };

    if count <= max {
        return Ok(Verdict::Warned(count));
    }

    let issued = Utc::now();
    let ban = BanRecord {
        player: player.key().to_string(),
        origin,
        issued,
        expires: issued + ban_length(length),
    };
    store.add_ban(ban.clone()).await?;
    info!("Banned {} until {} ({:?})", player, ban.expires, origin);
    Ok(Verdict::Banned(ban))
}

fn ban_length(length: Duration) -> ChronoDuration {
    ChronoDuration::from_std(length).unwrap_or_else(|_| ChronoDuration::hours(24))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;

    fn config() -> PickupConfig {
        PickupConfig {
            max_no_shows: 2,
            max_subs: 1,
            ..PickupConfig::default()
        }
    }

    #[tokio::test]
    async fn no_show_ban_is_issued_once_the_maximum_is_exceeded() {
        let store = MemoryStore::new();
        let config = config();
        let player = PlayerId::new("Klesk");

        for expected in 1..=2 {
            let verdict = apply(&store, &config, &player, Offence::NoShow).await.unwrap();
            assert_eq!(verdict, Verdict::Warned(expected));
            assert_eq!(store.find_ban(&player).await.unwrap(), None);
        }

        let verdict = apply(&store, &config, &player, Offence::NoShow).await.unwrap();
        let ban = match verdict {
            Verdict::Banned(ban) => ban,
            other => panic!("expected a ban, got {:?}", other),
        };
        assert_eq!(ban.origin, BanOrigin::PickupNoShow);
        assert_eq!(ban.expires - ban.issued, ChronoDuration::hours(24));
        assert_eq!(store.find_ban(&player).await.unwrap(), Some(ban));
        assert_eq!(store.stats(&player).await.unwrap().no_shows, 3);
    }

    #[tokio::test]
    async fn excess_subs_only_checks_the_threshold() {
        let store = MemoryStore::new();
        let config = config();
        let player = PlayerId::new("Slash");

        store.increment(&player, Counter::SubsUsed).await.unwrap();
        assert_eq!(
            apply(&store, &config, &player, Offence::ExcessSubs).await.unwrap(),
            Verdict::Warned(1)
        );

        store.increment(&player, Counter::SubsUsed).await.unwrap();
        let verdict = apply(&store, &config, &player, Offence::ExcessSubs).await.unwrap();
        assert!(matches!(verdict, Verdict::Banned(ref ban) if ban.origin == BanOrigin::PickupSub));
        assert_eq!(store.stats(&player).await.unwrap().subs_used, 2);
    }

    #[tokio::test]
    async fn privileged_accounts_are_exempt() {
        let store = MemoryStore::new();
        let mut config = config();
        config.max_no_shows = 0;
        config.owners.insert(PlayerId::new("sarge"));
        let admin = PlayerId::new("Hossman");
        store.set_level(&admin, PrivilegeLevel::Admin).await;

        for player in [admin, PlayerId::new("Sarge")] {
            let verdict = apply(&store, &config, &player, Offence::NoShow).await.unwrap();
            assert_eq!(verdict, Verdict::Exempt);
            assert_eq!(store.stats(&player).await.unwrap().no_shows, 0);
        }
    }
}
