use crate::config::KeepPolicy;
use crate::inventory::{Inventory, KeepReason, KeptData};

/// Marks an image kept if its digest is explicitly whitelisted.
pub fn apply(inventory: &mut Inventory, policy: &KeepPolicy) {
    if policy.digests.is_empty() {
        return;
    }
    for repository in inventory.iter_mut() {
        for image in repository.images.iter_mut() {
            if image.kept_data.is_decided() {
                continue;
            }
            if policy.digests.contains(&image.digest) {
                image.kept_data = KeptData {
                    reason: KeepReason::WhitelistedDigest,
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
    fn keeps_image_with_whitelisted_digest() {
        let mut repo = Repository::new("ns/a");
        repo.images.push(Image::new("sha256:keep", "0"));
        repo.images.push(Image::new("sha256:drop", "0"));
        let mut inv = vec![repo];

        let policy = KeepPolicy {
            digests: hashset! { "sha256:keep".to_string() },
            ..KeepPolicy::default()
        };

        apply(&mut inv, &policy);

        assert_eq!(inv[0].images[0].kept_data.reason, KeepReason::WhitelistedDigest);
        assert_eq!(inv[0].images[1].kept_data.reason, KeepReason::None);
    }
}
