//! Archive packaging
//!
//! Two on-disk formats, picked by filename suffix:
//! - `.json`: the snapshot payload as UTF-8 text, no assets
//! - bundled archive: a zip container with `state.json`, one
//!   `assets/<assetId>` binary member per registered asset, and an
//!   `assets.json` index written last, present only when assets exist
//!
//! Member names are case-sensitive. On open, recovered assets are registered
//! before the state is applied so transforms can resolve them during
//! evaluation.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

use prism_asset::{AssetMeta, AssetRegistry};
use prism_runtime::Reconciler;

use crate::data::{set_snapshot, SnapshotData};
use crate::error::SnapshotError;

/// Payload member name
pub const STATE_MEMBER: &str = "state.json";
/// Asset index member name
pub const ASSETS_MEMBER: &str = "assets.json";
/// Prefix of binary asset members
pub const ASSET_PREFIX: &str = "assets/";
/// Suffix used for bundled archives
pub const ARCHIVE_EXTENSION: &str = "prism";

/// Write a bundled archive
pub fn pack_archive<W: Write + Seek>(
    writer: W,
    data: &SnapshotData,
    assets: &AssetRegistry,
) -> Result<(), SnapshotError> {
    let mut zip = ZipWriter::new(writer);
    let options = FileOptions::default();

    let state =
        serde_json::to_vec(data).map_err(|e| SnapshotError::Serialization(e.to_string()))?;
    zip.start_file(STATE_MEMBER, options).map_err(zip_err)?;
    zip.write_all(&state)?;

    // Registry iteration order; ids are unique upstream.
    let mut listed: Vec<(String, AssetMeta)> = Vec::new();
    for (meta, bytes) in assets.entries() {
        zip.start_file(format!("{}{}", ASSET_PREFIX, meta.id), options)
            .map_err(zip_err)?;
        zip.write_all(&bytes)?;
        listed.push((meta.id.clone(), meta));
    }

    // The index goes last, and only when at least one asset was written.
    if !listed.is_empty() {
        let index =
            serde_json::to_vec(&listed).map_err(|e| SnapshotError::Serialization(e.to_string()))?;
        zip.start_file(ASSETS_MEMBER, options).map_err(zip_err)?;
        zip.write_all(&index)?;
    }

    zip.finish().map_err(zip_err)?;
    Ok(())
}

/// Read a bundled archive back into a payload and its assets
pub fn unpack_archive<R: Read + Seek>(
    reader: R,
) -> Result<(SnapshotData, Vec<(AssetMeta, Vec<u8>)>), SnapshotError> {
    let mut zip = ZipArchive::new(reader).map_err(zip_err)?;

    let mut members: HashMap<String, Vec<u8>> = HashMap::new();
    for i in 0..zip.len() {
        let mut member = zip.by_index(i).map_err(zip_err)?;
        let mut bytes = Vec::new();
        member.read_to_end(&mut bytes)?;
        members.insert(member.name().to_string(), bytes);
    }

    let state = members
        .remove(STATE_MEMBER)
        .ok_or_else(|| SnapshotError::ArchiveCorrupt("missing state.json".to_string()))?;

    let mut assets = Vec::new();
    if let Some(index) = members.remove(ASSETS_MEMBER) {
        let listed: Vec<(String, AssetMeta)> = serde_json::from_slice(&index)
            .map_err(|e| SnapshotError::ArchiveCorrupt(format!("unreadable assets.json: {}", e)))?;
        for (id, meta) in listed {
            let bytes = members
                .remove(&format!("{}{}", ASSET_PREFIX, id))
                .ok_or_else(|| {
                    SnapshotError::ArchiveCorrupt(format!("missing asset member '{}'", id))
                })?;
            assets.push((meta, bytes));
        }
    }

    let data = serde_json::from_slice(&state)
        .map_err(|e| SnapshotError::ArchiveCorrupt(format!("unreadable state.json: {}", e)))?;
    Ok((data, assets))
}

/// Write a payload to disk, as plain JSON or a bundled archive depending on
/// the filename suffix
pub fn export_to_file(
    path: &Path,
    data: &SnapshotData,
    assets: &AssetRegistry,
) -> Result<(), SnapshotError> {
    if is_plain_json(path) {
        let text = serde_json::to_string_pretty(data)
            .map_err(|e| SnapshotError::Serialization(e.to_string()))?;
        std::fs::write(path, text)?;
    } else {
        let file = File::create(path)?;
        pack_archive(file, data, assets)?;
    }
    Ok(())
}

/// Open a snapshot file and apply it
///
/// Recovered assets are registered before the state is applied. Any parse or
/// structural failure is logged and leaves the committed tree untouched;
/// the return value says whether a snapshot was applied.
pub async fn open_file(
    reconciler: &mut Reconciler,
    assets: &AssetRegistry,
    path: &Path,
) -> bool {
    match try_open(reconciler, assets, path).await {
        Ok(()) => true,
        Err(err) => {
            log::error!("failed to open snapshot {}: {}", path.display(), err);
            false
        }
    }
}

async fn try_open(
    reconciler: &mut Reconciler,
    assets: &AssetRegistry,
    path: &Path,
) -> Result<(), SnapshotError> {
    let bytes = std::fs::read(path)?;
    let data = if is_plain_json(path) {
        serde_json::from_slice(&bytes).map_err(|e| SnapshotError::Serialization(e.to_string()))?
    } else {
        let (data, recovered) = unpack_archive(Cursor::new(bytes))?;
        for (meta, bytes) in recovered {
            assets.set(meta, bytes);
        }
        data
    };
    set_snapshot(reconciler, data).await?;
    Ok(())
}

fn is_plain_json(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

fn zip_err(err: zip::result::ZipError) -> SnapshotError {
    SnapshotError::ArchiveCorrupt(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{get_snapshot, SnapshotOptions};
    use crate::testing::runtime;
    use prism_runtime::UpdateOptions;
    use serde_json::{json, Value};
    use std::env::temp_dir;

    fn payload() -> SnapshotData {
        let data = serde_json::json!({
            "version": 1,
            "nodes": [{ "ref": prism_state::ROOT_REF, "parent": prism_state::ROOT_REF, "kind": "root" }]
        });
        serde_json::from_value(data).unwrap()
    }

    fn registry_with_assets() -> AssetRegistry {
        let registry = AssetRegistry::new();
        registry.set(AssetMeta::new("a1", "model.bcif"), vec![1u8, 2, 3]);
        registry.set(AssetMeta::new("a2", "volume.ccp4"), vec![4u8, 5]);
        registry
    }

    #[test]
    fn test_archive_round_trip() {
        let assets = registry_with_assets();
        let data = payload();

        let mut buffer = Cursor::new(Vec::new());
        pack_archive(&mut buffer, &data, &assets).unwrap();

        buffer.set_position(0);
        let (back, recovered) = unpack_archive(buffer).unwrap();
        assert_eq!(back, data);
        assert_eq!(recovered.len(), 2);
        assert_eq!(recovered[0].0.id, "a1");
        assert_eq!(recovered[0].1, vec![1, 2, 3]);
        assert_eq!(recovered[1].0.id, "a2");
    }

    #[test]
    fn test_assets_index_absent_without_assets() {
        let mut buffer = Cursor::new(Vec::new());
        pack_archive(&mut buffer, &payload(), &AssetRegistry::new()).unwrap();

        buffer.set_position(0);
        let mut zip = ZipArchive::new(buffer).unwrap();
        assert!(zip.by_name(ASSETS_MEMBER).is_err());
    }

    #[test]
    fn test_missing_state_member_is_corrupt() {
        let mut buffer = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(&mut buffer);
        zip.start_file("other.txt", FileOptions::default()).unwrap();
        zip.write_all(b"junk").unwrap();
        zip.finish().unwrap();
        drop(zip);

        buffer.set_position(0);
        assert!(matches!(
            unpack_archive(buffer),
            Err(SnapshotError::ArchiveCorrupt(_))
        ));
    }

    #[tokio::test]
    async fn test_file_round_trip_with_assets() {
        let mut rt = runtime();
        let (t, _) = rt
            .tree()
            .add(&rt.tree().root(), "data", json!({ "asset": "a1" }), vec![])
            .unwrap();
        rt.update_tree(t, UpdateOptions::new()).await.unwrap();

        let data = get_snapshot(&rt, &SnapshotOptions::new());
        let assets = registry_with_assets();
        let path = temp_dir().join("prism_test_session.prism");
        export_to_file(&path, &data, &assets).unwrap();

        let mut restored = runtime();
        let fresh_assets = AssetRegistry::new();
        assert!(open_file(&mut restored, &fresh_assets, &path).await);

        // every packaged asset was registered, and the tree came back
        assert_eq!(fresh_assets.len(), 2);
        assert!(fresh_assets.get("a1").is_some());
        assert_eq!(restored.tree(), rt.tree());

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_plain_json_round_trip() {
        let mut rt = runtime();
        let (t, _) = rt
            .tree()
            .add(&rt.tree().root(), "data", Value::Null, vec![])
            .unwrap();
        rt.update_tree(t, UpdateOptions::new()).await.unwrap();

        let data = get_snapshot(&rt, &SnapshotOptions::new());
        let path = temp_dir().join("prism_test_session.json");
        export_to_file(&path, &data, &AssetRegistry::new()).unwrap();

        let mut restored = runtime();
        assert!(open_file(&mut restored, &AssetRegistry::new(), &path).await);
        assert_eq!(restored.tree(), rt.tree());

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_open_failure_is_a_noop() {
        let path = temp_dir().join("prism_test_garbage.prism");
        std::fs::write(&path, b"not an archive").unwrap();

        let mut rt = runtime();
        let (t, _) = rt
            .tree()
            .add(&rt.tree().root(), "data", Value::Null, vec![])
            .unwrap();
        rt.update_tree(t, UpdateOptions::new()).await.unwrap();
        let before = rt.tree().clone();

        assert!(!open_file(&mut rt, &AssetRegistry::new(), &path).await);
        assert_eq!(rt.tree(), &before);

        let _ = std::fs::remove_file(&path);
    }
}
