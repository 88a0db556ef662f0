use crate::config::KeepPolicy;
use crate::inventory::{Inventory, KeepReason, KeptData};

/// Guarantees every repository retains at least `policy.at_least` images,
/// even if nothing else would have kept them. For each repository
/// independently: count already-annotated images, then mark the most
/// recently uploaded not-yet-annotated images until the floor is met.
pub fn apply(inventory: &mut Inventory, policy: &KeepPolicy) {
    if policy.at_least == 0 {
        return;
    }

    for repository in inventory.iter_mut() {
        let already_kept = repository.images.iter().filter(|i| i.kept_data.is_decided()).count();
        if already_kept >= policy.at_least {
            continue;
        }
        let need = policy.at_least - already_kept;

        let mut undecided: Vec<usize> = repository
            .images
            .iter()
            .enumerate()
            .filter(|(_, i)| !i.kept_data.is_decided())
            .map(|(idx, _)| idx)
            .collect();

        undecided.sort_by(|&a, &b| {
            let ua: u128 = repository.images[a].uploaded_ms.parse().unwrap_or(0);
            let ub: u128 = repository.images[b].uploaded_ms.parse().unwrap_or(0);
            ub.cmp(&ua)
        });

        for &idx in undecided.iter().take(need) {
            repository.images[idx].kept_data = KeptData {
                reason: KeepReason::OneOfFew,
                metadata: None,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{Image, Repository};

    #[test]
    fn keeps_the_most_recent_image_when_floor_is_one() {
        let mut repo = Repository::new("ns/only1");
        repo.images.push(Image::new("old", "1000"));
        repo.images.push(Image::new("new", "2000"));
        let mut inv = vec![repo];

        apply(&mut inv, &KeepPolicy { at_least: 1, ..KeepPolicy::default() });

        assert_eq!(inv[0].images[0].kept_data.reason, KeepReason::None);
        assert_eq!(inv[0].images[1].kept_data.reason, KeepReason::OneOfFew);
    }

    #[test]
    fn disabled_when_at_least_is_zero() {
        let mut repo = Repository::new("ns/only1");
        repo.images.push(Image::new("a", "1000"));
        repo.images.push(Image::new("b", "2000"));
        let mut inv = vec![repo];

        apply(&mut inv, &KeepPolicy { at_least: 0, ..KeepPolicy::default() });

        assert!(inv[0].images.iter().all(|i| i.kept_data.reason == KeepReason::None));
    }

    #[test]
    fn floor_larger_than_repo_keeps_everything() {
        let mut repo = Repository::new("ns/small");
        repo.images.push(Image::new("a", "1000"));
        repo.images.push(Image::new("b", "2000"));
        repo.images.push(Image::new("c", "3000"));
        let mut inv = vec![repo];

        apply(&mut inv, &KeepPolicy { at_least: 10, ..KeepPolicy::default() });

        assert!(inv[0].images.iter().all(|i| i.kept_data.reason == KeepReason::OneOfFew));
        assert_eq!(inv[0].should_delete_count(), 0);
    }
}
