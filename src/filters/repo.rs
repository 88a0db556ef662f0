use crate::config::KeepPolicy;
use crate::inventory::{Inventory, KeepReason, KeptData};

/// Marks every image in a whitelisted repository as kept, unconditionally.
pub fn apply(inventory: &mut Inventory, policy: &KeepPolicy) {
    for repository in inventory.iter_mut() {
        if !policy.repositories.contains(&repository.link) {
            continue;
        }
        for image in repository.images.iter_mut() {
            if image.kept_data.is_decided() {
                continue;
            }
            image.kept_data = KeptData {
                reason: KeepReason::WhitelistedRepository,
                metadata: None,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{Image, Repository};
    use maplit::hashset;

    #[test]
    fn marks_every_image_in_whitelisted_repo() {
        let mut repo = Repository::new("ns/kept");
        repo.images.push(Image::new("d1", "0"));
        repo.images.push(Image::new("d2", "0"));
        let mut inv = vec![repo];

        let policy = KeepPolicy {
            repositories: hashset! { "ns/kept".to_string() },
            ..KeepPolicy::default()
        };

        apply(&mut inv, &policy);

        assert!(inv[0].images.iter().all(|i| i.kept_data.reason == KeepReason::WhitelistedRepository));
    }
}
