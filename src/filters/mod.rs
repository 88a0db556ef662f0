mod age;
mod digest;
mod k8s_usage;
mod repo;
mod retention;
mod tag;

use crate::config::KeepPolicy;
use crate::inventory::Inventory;
use crate::k8s::UsageMap;

/// Runs every keep rule in the fixed order required for the pipeline's
/// first-writer-wins contract: repository whitelist, age, tag whitelist,
/// digest whitelist, cluster usage, retention floor. Each rule only
/// annotates images it finds undecided; once an image carries any
/// keep-reason, later rules must leave it untouched.
pub fn apply_pipeline(inventory: &mut Inventory, policy: &KeepPolicy, usage: &UsageMap) {
    repo::apply(inventory, policy);
    age::apply(inventory, policy);
    tag::apply(inventory, policy);
    digest::apply(inventory, policy);
    k8s_usage::apply(inventory, usage);
    retention::apply(inventory, policy);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{Image, KeepReason, Repository};
    use duration_str::parse;
    use std::time::Duration;

    fn policy(at_least: usize, younger_than: Option<&str>) -> KeepPolicy {
        KeepPolicy {
            younger_than: younger_than.map(|s| s.to_string()),
            at_least,
            clusters: vec![],
            tags: Default::default(),
            digests: Default::default(),
            repositories: Default::default(),
        }
    }

    fn now_ms() -> u128 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis()
    }

    #[test]
    fn whitelisted_repo_beats_age() {
        let mut inv: Inventory = vec![
            {
                let mut r = Repository::new("ns/whitelistedRepo");
                r.images.push(Image::new("d1", (now_ms() - year_ms()).to_string()));
                r
            },
            {
                let mut r = Repository::new("ns/whitelistedDueToTime");
                r.images.push(Image::new("d2", now_ms().to_string()));
                r
            },
            {
                let mut r = Repository::new("ns/other");
                r.images.push(Image::new("d3", (now_ms() - year_ms()).to_string()));
                r
            },
        ];

        let mut p = policy(0, Some("2d"));
        p.repositories.insert("ns/whitelistedRepo".to_string());
        let usage = UsageMap::new();

        apply_pipeline(&mut inv, &p, &usage);

        assert_eq!(inv[0].images[0].kept_data.reason, KeepReason::WhitelistedRepository);
        assert_eq!(inv[1].images[0].kept_data.reason, KeepReason::Young);
        assert_eq!(inv[2].images[0].kept_data.reason, KeepReason::None);

        // sanity-check the duration parser used by the age filter.
        assert!(parse("2d").unwrap() > Duration::from_secs(0));
    }

    fn year_ms() -> u128 {
        365 * 24 * 60 * 60 * 1000
    }
}
