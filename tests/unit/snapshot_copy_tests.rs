//! Unit tests for the snapshot world copy.

use std::fs;

use minecloud_wrapper::tasks::snapshot::copy_world;
use minecloud_wrapper::AppError;

#[tokio::test]
async fn copies_nested_tree_under_world_name() {
    let dir = tempfile::tempdir().expect("tempdir");
    let world = dir.path().join("universe").join("survival");
    fs::create_dir_all(world.join("region")).expect("mkdir");
    fs::create_dir_all(world.join("playerdata")).expect("mkdir");
    fs::write(world.join("level.dat"), b"level").expect("write");
    fs::write(world.join("region").join("r.0.0.mca"), b"region").expect("write");

    let snapshots = dir.path().join("snapshots");
    let destination = copy_world(&world, &snapshots).await.expect("copy");

    assert_eq!(
        destination,
        fs::canonicalize(snapshots.join("survival")).expect("canonicalize")
    );
    assert_eq!(fs::read(destination.join("level.dat")).expect("read"), b"level");
    assert_eq!(
        fs::read(destination.join("region").join("r.0.0.mca")).expect("read"),
        b"region"
    );
    assert!(destination.join("playerdata").is_dir());
}

#[tokio::test]
async fn existing_snapshot_is_overwritten() {
    let dir = tempfile::tempdir().expect("tempdir");
    let world = dir.path().join("world");
    fs::create_dir_all(&world).expect("mkdir");
    fs::write(world.join("level.dat"), b"new").expect("write");

    let snapshots = dir.path().join("snapshots");
    fs::create_dir_all(snapshots.join("world")).expect("mkdir");
    fs::write(snapshots.join("world").join("level.dat"), b"old").expect("write");

    copy_world(&world, &snapshots).await.expect("copy");
    assert_eq!(
        fs::read(snapshots.join("world").join("level.dat")).expect("read"),
        b"new"
    );
}

#[tokio::test]
async fn missing_world_is_a_snapshot_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = copy_world(&dir.path().join("absent"), &dir.path().join("snapshots"))
        .await
        .expect_err("must fail");
    assert!(matches!(err, AppError::Snapshot(_)), "{err}");
}

#[tokio::test]
async fn destination_inside_world_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let world = dir.path().join("world");
    fs::create_dir_all(&world).expect("mkdir");

    let err = copy_world(&world, &world.join("backups"))
        .await
        .expect_err("must fail");
    assert!(err.to_string().contains("inside the world dir"), "{err}");
}

#[tokio::test]
async fn destination_inside_world_is_rejected_through_parent_segments() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::create_dir_all(dir.path().join("x")).expect("mkdir");
    fs::create_dir_all(dir.path().join("world")).expect("mkdir");

    let world = dir.path().join("x").join("..").join("world");
    let err = copy_world(&world, &dir.path().join("world").join("snaps"))
        .await
        .expect_err("must fail");
    assert!(err.to_string().contains("inside the world dir"), "{err}");
    assert!(!dir.path().join("world").join("snaps").exists());
}

#[tokio::test]
async fn snapshot_dir_with_parent_segments_is_rejected_inside_world() {
    let dir = tempfile::tempdir().expect("tempdir");
    let world = dir.path().join("world");
    fs::create_dir_all(&world).expect("mkdir");

    let snapshots = dir.path().join("missing").join("..").join("world").join("snaps");
    let err = copy_world(&world, &snapshots).await.expect_err("must fail");
    assert!(err.to_string().contains("inside the world dir"), "{err}");
}

#[tokio::test]
async fn world_path_with_parent_segments_copies_under_its_real_name() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::create_dir_all(dir.path().join("x")).expect("mkdir");
    fs::create_dir_all(dir.path().join("world")).expect("mkdir");
    fs::write(dir.path().join("world").join("level.dat"), b"level").expect("write");

    let world = dir.path().join("x").join("..").join("world");
    let destination = copy_world(&world, &dir.path().join("snapshots"))
        .await
        .expect("copy");

    assert_eq!(destination.file_name().and_then(|name| name.to_str()), Some("world"));
    assert_eq!(fs::read(destination.join("level.dat")).expect("read"), b"level");
}

#[cfg(unix)]
#[tokio::test]
async fn symlinked_world_is_resolved_before_the_containment_check() {
    let dir = tempfile::tempdir().expect("tempdir");
    let real = dir.path().join("real-world");
    fs::create_dir_all(&real).expect("mkdir");
    let alias = dir.path().join("world");
    std::os::unix::fs::symlink(&real, &alias).expect("symlink");

    let err = copy_world(&alias, &real.join("snaps"))
        .await
        .expect_err("must fail");
    assert!(err.to_string().contains("inside the world dir"), "{err}");
}

#[cfg(unix)]
#[tokio::test]
async fn symlinks_are_copied_as_links() {
    let dir = tempfile::tempdir().expect("tempdir");
    let world = dir.path().join("world");
    fs::create_dir_all(&world).expect("mkdir");
    fs::write(world.join("level.dat"), b"level").expect("write");
    std::os::unix::fs::symlink("level.dat", world.join("latest")).expect("symlink");

    let snapshots = dir.path().join("snapshots");
    copy_world(&world, &snapshots).await.expect("copy");

    let link = snapshots.join("world").join("latest");
    assert!(fs::symlink_metadata(&link).expect("meta").file_type().is_symlink());
    assert_eq!(fs::read_link(&link).expect("read_link"), std::path::PathBuf::from("level.dat"));
}
