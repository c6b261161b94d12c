//! Private pipe used to hand a passphrase to a child process.
//!
//! The read end is inherited by the child as an extra descriptor and named on
//! its command line by number (`--passphrase-fd N`), so the secret itself never
//! shows up in argv, the environment, or the standard streams. Both ends are
//! created close-on-exec; the runner clears the flag on the read end inside the
//! child only.

use std::fmt;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use tokio::io::AsyncWriteExt;
use tokio::net::unix::pipe;
use tokio::task::JoinHandle;
use tracing::debug;
use zeroize::Zeroizing;

/// Passphrase bytes. Wiped on drop and never printed.
#[derive(Clone)]
pub struct Passphrase(Zeroizing<Vec<u8>>);

impl Passphrase {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(bytes.into()))
    }

    pub fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase(<redacted>)")
    }
}

impl From<&str> for Passphrase {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes())
    }
}

impl From<String> for Passphrase {
    fn from(value: String) -> Self {
        Self::new(value.into_bytes())
    }
}

impl From<Vec<u8>> for Passphrase {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}

/// Write side of a secret channel. Consumed by a single write.
#[derive(Debug)]
pub struct SecretWriter {
    fd: OwnedFd,
}

/// Read side of a secret channel, destined for the child process.
#[derive(Debug)]
pub struct InheritedFd {
    fd: OwnedFd,
}

impl InheritedFd {
    /// Descriptor number as the child will see it.
    pub fn raw(&self) -> RawFd {
        self.fd.as_raw_fd()
    }

    pub fn into_owned(self) -> OwnedFd {
        self.fd
    }
}

/// Create a unidirectional pipe for one passphrase transfer.
pub fn open() -> io::Result<(SecretWriter, InheritedFd)> {
    let mut fds: [libc::c_int; 2] = [-1; 2];

    #[cfg(any(
        target_os = "linux",
        target_os = "android",
        target_os = "freebsd",
        target_os = "netbsd",
        target_os = "openbsd",
        target_os = "dragonfly"
    ))]
    // SAFETY: `fds` is a valid buffer for two descriptors.
    let rc = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) };

    #[cfg(not(any(
        target_os = "linux",
        target_os = "android",
        target_os = "freebsd",
        target_os = "netbsd",
        target_os = "openbsd",
        target_os = "dragonfly"
    )))]
    // SAFETY: `fds` is a valid buffer for two descriptors.
    let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };

    if rc != 0 {
        return Err(io::Error::last_os_error());
    }

    // SAFETY: pipe succeeded, so both descriptors are open and owned by nobody else.
    let (reader, writer) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };

    #[cfg(not(any(
        target_os = "linux",
        target_os = "android",
        target_os = "freebsd",
        target_os = "netbsd",
        target_os = "openbsd",
        target_os = "dragonfly"
    )))]
    {
        set_cloexec(reader.as_raw_fd(), true)?;
        set_cloexec(writer.as_raw_fd(), true)?;
    }

    debug!(read_fd = reader.as_raw_fd(), "Opened passphrase channel");
    Ok((SecretWriter { fd: writer }, InheritedFd { fd: reader }))
}

impl SecretWriter {
    /// Write the passphrase on a background task, then close the pipe.
    ///
    /// Runs concurrently with the child so a full pipe cannot stall process
    /// startup. The task must be joined by the caller.
    pub fn spawn_write(self, passphrase: Passphrase) -> JoinHandle<io::Result<()>> {
        tokio::spawn(async move {
            let mut sender = pipe::Sender::from_owned_fd(self.fd)?;
            sender.write_all(passphrase.expose()).await?;
            sender.flush().await?;
            // Dropping the sender closes the write end; the child sees EOF.
            Ok(())
        })
    }
}

/// Set or clear `FD_CLOEXEC` on a descriptor.
pub(crate) fn set_cloexec(fd: RawFd, enabled: bool) -> io::Result<()> {
    // SAFETY: F_GETFD/F_SETFD only touch descriptor flags.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    let updated = if enabled {
        flags | libc::FD_CLOEXEC
    } else {
        flags & !libc::FD_CLOEXEC
    };
    if updated != flags && unsafe { libc::fcntl(fd, libc::F_SETFD, updated) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
