use crate::config::KeepPolicy;
use crate::inventory::{Inventory, KeepReason, KeptData};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Marks images uploaded more recently than `policy.younger_than` as kept.
///
/// The duration string is parsed eagerly at config-resolution time (see
/// `config::resolve`), so a malformed duration never reaches this filter.
/// A per-image timestamp that fails to parse is logged and the image is
/// skipped entirely for this run, rather than failing the whole crawl.
pub fn apply(inventory: &mut Inventory, policy: &KeepPolicy) {
    let Some(raw) = &policy.younger_than else {
        return;
    };
    let Ok(threshold) = duration_str::parse(raw) else {
        return;
    };

    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);

    for repository in inventory.iter_mut() {
        for image in repository.images.iter_mut() {
            if image.kept_data.is_decided() {
                continue;
            }
            let Ok(uploaded_ms) = image.uploaded_ms.parse::<u128>() else {
                tracing::warn!(
                    repository = %repository.link,
                    digest = %image.digest,
                    raw_timestamp = %image.uploaded_ms,
                    "could not parse upload timestamp, skipping age check for this image"
                );
                continue;
            };
            let uploaded = Duration::from_millis(uploaded_ms as u64);
            if now.saturating_sub(uploaded) < threshold {
                image.kept_data = KeptData {
                    reason: KeepReason::Young,
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
    use tracing_test::traced_test;

    fn now_ms() -> u128 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_millis()
    }

    #[test]
    fn keeps_images_younger_than_threshold() {
        let mut repo = Repository::new("ns/a");
        repo.images.push(Image::new("fresh", now_ms().to_string()));
        repo.images.push(Image::new("old", (now_ms() - 1_000 * 60 * 60 * 24 * 365).to_string()));
        let mut inv = vec![repo];

        let policy = KeepPolicy {
            younger_than: Some("2d".to_string()),
            ..KeepPolicy::default()
        };

        apply(&mut inv, &policy);

        assert_eq!(inv[0].images[0].kept_data.reason, KeepReason::Young);
        assert_eq!(inv[0].images[1].kept_data.reason, KeepReason::None);
    }

    #[test]
    fn skips_image_with_unparseable_timestamp_without_panicking() {
        let mut repo = Repository::new("ns/a");
        repo.images.push(Image::new("bad", "not-a-timestamp"));
        let mut inv = vec![repo];

        let policy = KeepPolicy {
            younger_than: Some("2d".to_string()),
            ..KeepPolicy::default()
        };

        apply(&mut inv, &policy);

        assert_eq!(inv[0].images[0].kept_data.reason, KeepReason::None);
    }

    #[tracing_test::traced_test]
    #[test]
    fn logs_a_warning_for_an_unparseable_timestamp() {
        let mut repo = Repository::new("ns/a");
        repo.images.push(Image::new("bad", "not-a-timestamp"));
        let mut inv = vec![repo];

        apply(
            &mut inv,
            &KeepPolicy {
                younger_than: Some("2d".to_string()),
                ..KeepPolicy::default()
            },
        );

        assert!(logs_contain("could not parse upload timestamp"));
    }
}
