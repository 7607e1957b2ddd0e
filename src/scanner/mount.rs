//! Filesystem type classification for traversal pruning.
//!
//! Pseudo filesystems (procfs, sysfs, cgroup, ...) are never traversed.
//! Network filesystems (NFS, SMB, ...) are traversed only on request.

use std::path::{Path, PathBuf};

/// Reports what kind of filesystem a path lives on.
pub trait MountClassifier {
    /// True if `path` resides on a pseudo filesystem.
    fn is_pseudo_fs(&self, path: &Path) -> bool;

    /// True if `path` resides on a network filesystem.
    fn is_network_fs(&self, path: &Path) -> bool;
}

/// `statfs(2)` magic numbers of pseudo filesystems (see `linux/magic.h`).
const PSEUDO_FS_MAGICS: &[u32] = &[
    0x0000_9fa0, // PROC_SUPER_MAGIC
    0x6265_6572, // SYSFS_MAGIC
    0x6462_6720, // DEBUGFS_MAGIC
    0x7472_6163, // TRACEFS_MAGIC
    0x0027_e0eb, // CGROUP_SUPER_MAGIC
    0x6367_7270, // CGROUP2_SUPER_MAGIC
    0x0000_1cd1, // DEVPTS_SUPER_MAGIC
    0x7363_6673, // SECURITYFS_MAGIC
    0xf97c_ff8c, // SELINUX_MAGIC
    0x4249_4e4d, // BINFMTFS_MAGIC
    0x6165_676c, // PSTOREFS_MAGIC
    0xde5e_81e4, // EFIVARFS_MAGIC
    0xcafe_4a11, // BPF_FS_MAGIC
    0x6265_6570, // CONFIGFS_MAGIC
    0x6573_5543, // FUSECTL_SUPER_MAGIC
    0x1980_0202, // MQUEUE_MAGIC
    0x6e73_6673, // NSFS_MAGIC
    0x9584_58f6, // HUGETLBFS_MAGIC
    0x0000_9fa2, // USBDEVICE_SUPER_MAGIC
    0x5a3c_69f0, // AUTOFS_SUPER_MAGIC
];

/// `statfs(2)` magic numbers of network filesystems.
const NETWORK_FS_MAGICS: &[u32] = &[
    0x0000_6969, // NFS_SUPER_MAGIC
    0x0000_517b, // SMB_SUPER_MAGIC
    0xff53_4d42, // CIFS_MAGIC_NUMBER
    0xfe53_4d42, // SMB2_MAGIC_NUMBER
    0x7375_7245, // CODA_SUPER_MAGIC
    0x5346_414f, // AFS_SUPER_MAGIC
    0x6b41_4653, // AFS_FS_MAGIC
    0x0000_564c, // NCP_SUPER_MAGIC
    0x00c3_6400, // CEPH_SUPER_MAGIC
    0x0102_1997, // V9FS_MAGIC
    0x0bd0_0bd0, // LUSTRE_SUPER_MAGIC
    0x4732_4846, // GPFS_SUPER_MAGIC
];

/// Classifies paths by the `f_type` that `statfs(2)` reports.
///
/// Paths that cannot be queried are treated as regular local storage; the walk
/// itself will report any access error. Off Linux every path is regular.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatfsMountClassifier;

impl StatfsMountClassifier {
    pub fn new() -> Self {
        Self
    }

    #[cfg(target_os = "linux")]
    fn fs_magic(path: &Path) -> Option<u32> {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let c_path = CString::new(path.as_os_str().as_bytes()).ok()?;
        // SAFETY: `statfs` is plain old data; all-zero is a valid value.
        let mut stat: libc::statfs = unsafe { std::mem::zeroed() };
        // SAFETY: `c_path` is NUL-terminated and `stat` is a valid out pointer.
        let rc = unsafe { libc::statfs(c_path.as_ptr(), &mut stat) };
        if rc != 0 {
            log::trace!(
                "statfs failed for {}: {}",
                path.display(),
                std::io::Error::last_os_error()
            );
            return None;
        }
        // f_type is signed on some targets; all magics fit in 32 bits.
        Some(stat.f_type as u32)
    }

    #[cfg(not(target_os = "linux"))]
    fn fs_magic(_path: &Path) -> Option<u32> {
        None
    }
}

impl MountClassifier for StatfsMountClassifier {
    fn is_pseudo_fs(&self, path: &Path) -> bool {
        Self::fs_magic(path).is_some_and(|magic| PSEUDO_FS_MAGICS.contains(&magic))
    }

    fn is_network_fs(&self, path: &Path) -> bool {
        Self::fs_magic(path).is_some_and(|magic| NETWORK_FS_MAGICS.contains(&magic))
    }
}

/// Classifier backed by fixed lists of mount points.
///
/// A path is on a listed filesystem if it equals or lies beneath one of the
/// mount points. Useful where `statfs` is unavailable or for reproducible runs.
#[derive(Debug, Clone, Default)]
pub struct FixedMountClassifier {
    pseudo: Vec<PathBuf>,
    network: Vec<PathBuf>,
}

impl FixedMountClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pseudo filesystem mount point.
    pub fn with_pseudo(mut self, mount: impl Into<PathBuf>) -> Self {
        self.pseudo.push(mount.into());
        self
    }

    /// Add a network filesystem mount point.
    pub fn with_network(mut self, mount: impl Into<PathBuf>) -> Self {
        self.network.push(mount.into());
        self
    }
}

impl MountClassifier for FixedMountClassifier {
    fn is_pseudo_fs(&self, path: &Path) -> bool {
        self.pseudo.iter().any(|mount| path.starts_with(mount))
    }

    fn is_network_fs(&self, path: &Path) -> bool {
        self.network.iter().any(|mount| path.starts_with(mount))
    }
}
