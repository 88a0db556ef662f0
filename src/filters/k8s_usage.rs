use crate::inventory::{Inventory, KeepReason, KeptData};
use crate::k8s::UsageMap;

/// Marks an image kept if any of its `repo:tag` references or its
/// `repo@digest` reference appear in a live workload's container spec.
/// The originating cluster context is recorded as metadata.
pub fn apply(inventory: &mut Inventory, usage: &UsageMap) {
    if usage.is_empty() {
        return;
    }
    for repository in inventory.iter_mut() {
        for image in repository.images.iter_mut() {
            if image.kept_data.is_decided() {
                continue;
            }

            let mut hit: Option<&String> = None;
            for tag in &image.tags {
                let reference = format!("{}:{}", repository.link, tag);
                if let Some(cluster) = usage.get(&reference) {
                    hit = Some(cluster);
                    break;
                }
            }
            if hit.is_none() {
                let reference = format!("{}@{}", repository.link, image.digest);
                hit = usage.get(&reference);
            }

            if let Some(cluster) = hit {
                image.kept_data = KeptData {
                    reason: KeepReason::UsedInCluster,
                    metadata: Some(cluster.clone()),
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{Image, Repository};

    #[test]
    fn keeps_image_referenced_by_tag_in_live_pod() {
        let mut repo = Repository::new("ns/app");
        repo.images.push(Image::new("d1", "0").with_tag("v1"));
        let mut inv = vec![repo];

        let mut usage = UsageMap::new();
        usage.insert("ns/app:v1".to_string(), "prod".to_string());

        apply(&mut inv, &usage);

        assert_eq!(inv[0].images[0].kept_data.reason, KeepReason::UsedInCluster);
        assert_eq!(inv[0].images[0].kept_data.metadata.as_deref(), Some("prod"));
    }

    #[test]
    fn keeps_image_referenced_by_digest() {
        let mut repo = Repository::new("ns/app");
        repo.images.push(Image::new("sha256:abc", "0"));
        let mut inv = vec![repo];

        let mut usage = UsageMap::new();
        usage.insert("ns/app@sha256:abc".to_string(), "staging".to_string());

        apply(&mut inv, &usage);

        assert_eq!(inv[0].images[0].kept_data.reason, KeepReason::UsedInCluster);
    }
}
