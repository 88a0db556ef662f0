use crate::errors::PlanError;
use crate::inventory::Inventory;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use std::path::Path;

/// Serializes an annotated inventory as gzip-compressed pretty JSON.
pub fn serialize(inventory: &Inventory) -> Result<Vec<u8>, PlanError> {
    let json = serde_json::to_vec_pretty(inventory).map_err(|e| PlanError::SerializeFailed {
        raw_error_message: e.to_string(),
    })?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(&json).map_err(|e| PlanError::SerializeFailed {
        raw_error_message: e.to_string(),
    })?;
    encoder.finish().map_err(|e| PlanError::SerializeFailed {
        raw_error_message: e.to_string(),
    })
}

/// Reverses `serialize`. `parse(serialize(x)) == x` for any inventory `x`.
pub fn parse(bytes: &[u8]) -> Result<Inventory, PlanError> {
    let mut decoder = GzDecoder::new(bytes);
    let mut json = Vec::new();
    decoder.read_to_end(&mut json).map_err(|e| PlanError::DeserializeFailed {
        raw_error_message: e.to_string(),
    })?;
    serde_json::from_slice(&json).map_err(|e| PlanError::DeserializeFailed {
        raw_error_message: e.to_string(),
    })
}

pub fn write_to_file(path: &Path, inventory: &Inventory) -> Result<(), PlanError> {
    let bytes = serialize(inventory)?;
    std::fs::write(path, bytes).map_err(|e| PlanError::WriteFailed {
        path: path.display().to_string(),
        raw_error_message: e.to_string(),
    })
}

pub fn read_from_file(path: &Path) -> Result<Inventory, PlanError> {
    let bytes = std::fs::read(path).map_err(|e| PlanError::ReadFailed {
        path: path.display().to_string(),
        raw_error_message: e.to_string(),
    })?;
    parse(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{Image, KeepReason, KeptData, Repository};

    #[test]
    fn round_trips_an_annotated_inventory() {
        let mut repo = Repository::new("ns/app");
        let mut image = Image::new("sha256:abc", "12345").with_tag("v1").with_tag("v2");
        image.kept_data = KeptData {
            reason: KeepReason::UsedInCluster,
            metadata: Some("prod".to_string()),
        };
        repo.images.push(image);
        let inventory: Inventory = vec![repo];

        let bytes = serialize(&inventory).unwrap();
        let round_tripped = parse(&bytes).unwrap();

        assert_eq!(inventory, round_tripped);
    }

    #[test]
    fn round_trips_through_a_file() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let inventory: Inventory = vec![Repository::new("ns/empty")];

        write_to_file(tmp.path(), &inventory).unwrap();
        let loaded = read_from_file(tmp.path()).unwrap();

        assert_eq!(inventory, loaded);
    }
}
