use crate::config::KeepPolicy;
use crate::inventory::{Inventory, KeepReason, KeptData};

/// Marks an image kept if any of its tags are explicitly whitelisted.
pub fn apply(inventory: &mut Inventory, policy: &KeepPolicy) {
    if policy.tags.is_empty() {
        return;
    }
    for repository in inventory.iter_mut() {
        for image in repository.images.iter_mut() {
            if image.kept_data.is_decided() {
                continue;
            }
            if image.tags.iter().any(|t| policy.tags.contains(t)) {
                image.kept_data = KeptData {
                    reason: KeepReason::WhitelistedTag,
                    metadata: None,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{Image, Repository};
    use maplit::hashset;

    #[test]
    fn keeps_image_with_whitelisted_tag() {
        let mut repo = Repository::new("ns/a");
        repo.images.push(Image::new("d1", "0").with_tag("latest"));
        repo.images.push(Image::new("d2", "0").with_tag("old"));
        let mut inv = vec![repo];

        let policy = KeepPolicy {
            tags: hashset! { "latest".to_string() },
            ..KeepPolicy::default()
        };

        apply(&mut inv, &policy);

        assert_eq!(inv[0].images[0].kept_data.reason, KeepReason::WhitelistedTag);
        assert_eq!(inv[0].images[1].kept_data.reason, KeepReason::None);
    }
}
