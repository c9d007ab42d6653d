//! Resource manager sessions

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use pcsckit_transport::{PcscTransport, SerialExecutor, Transport};
use pcsckit_types::{ContextHandle, ReaderGroup};
use tracing::{debug, error, trace, warn};

use crate::config::SessionConfig;
use crate::driver::DriverKind;
use crate::error::Result;
use crate::reader::CardReader;

/// One resource manager context
///
/// Cloning is cheap and every clone shares the same context. The context
/// is released exactly once: by [`Session::close`], or in the background
/// when the last clone is dropped. Readers and units must not be used
/// after that point; their calls then fail with a hardware error.
///
/// # Examples
///
/// ```no_run
/// use pcsckit::Session;
///
/// #[tokio::main]
/// async fn main() -> pcsckit::Result<()> {
///     let session = Session::open().await?;
///
///     for reader in session.list_readers(&[], &[]).await? {
///         println!("{} ({})", reader.name(), reader.driver());
///     }
///
///     session.close().await;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    executor: Arc<SerialExecutor>,
    context: ContextHandle,
    config: SessionConfig,
    released: AtomicBool,
}

impl Session {
    /// Open a session on the system resource manager with default settings
    pub async fn open() -> Result<Self> {
        Self::open_with_config(SessionConfig::default()).await
    }

    pub async fn open_with_config(config: SessionConfig) -> Result<Self> {
        Self::open_with(Arc::new(PcscTransport::new()), config).await
    }

    /// Open a session over any transport
    pub async fn open_with(transport: Arc<dyn Transport>, config: SessionConfig) -> Result<Self> {
        let executor = Arc::new(SerialExecutor::new(transport)?);

        let scope = config.scope();
        let context = executor
            .run(move |t| t.establish_context(scope))
            .await
            .inspect_err(|e| error!("Context establishing error: {}", e))?;

        debug!("Context {} established", context);

        Ok(Self {
            inner: Arc::new(SessionInner {
                executor,
                context,
                config,
                released: AtomicBool::new(false),
            }),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn context(&self) -> ContextHandle {
        self.inner.context
    }

    pub(crate) fn executor(&self) -> &Arc<SerialExecutor> {
        &self.inner.executor
    }

    /// Readers in `groups` (all when empty)
    ///
    /// Each reader resolves its driver from `drivers`. A non-empty `drivers`
    /// also filters the result to readers that resolved to one of them.
    pub async fn list_readers(
        &self,
        groups: &[ReaderGroup],
        drivers: &[DriverKind],
    ) -> Result<Vec<CardReader>> {
        let context = self.context();
        let groups = groups.to_vec();
        let names = self
            .executor()
            .run(move |t| t.list_readers(context, &groups))
            .await?;

        trace!("Resource manager reports {} reader(s)", names.len());

        let readers = names
            .into_iter()
            .map(|name| CardReader::new(self.clone(), name, drivers))
            .filter(|reader| drivers.is_empty() || drivers.contains(&reader.driver()))
            .collect();

        Ok(readers)
    }

    pub async fn list_reader_groups(&self) -> Result<Vec<ReaderGroup>> {
        let context = self.context();
        Ok(self
            .executor()
            .run(move |t| t.list_reader_groups(context))
            .await?)
    }

    /// Ask the resource manager whether the context is still usable
    pub async fn is_valid(&self) -> bool {
        if self.inner.released.load(Ordering::SeqCst) {
            return false;
        }

        let context = self.context();
        self.executor()
            .run(move |t| Ok(t.is_valid_context(context)))
            .await
            .unwrap_or(false)
    }

    /// Abort a status-change wait currently blocking this context
    pub fn cancel(&self) -> Result<()> {
        Ok(self.executor().cancel(self.context())?)
    }

    /// Release the context now; failures are logged only
    pub async fn close(self) {
        if self.inner.released.swap(true, Ordering::SeqCst) {
            return;
        }

        let context = self.context();
        match self
            .executor()
            .run(move |t| t.release_context(context))
            .await
        {
            Ok(()) => debug!("Context {} released", context),
            Err(e) => warn!("Failed to release context {}: {}", context, e),
        }
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }

        let context = self.context;
        self.executor.detached(move |t| match t.release_context(context) {
            Ok(()) => trace!("Context {} released on drop", context),
            Err(e) => warn!("Failed to release context {}: {}", context, e),
        });
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("context", &self.inner.context)
            .field("released", &self.inner.released.load(Ordering::SeqCst))
            .field("config", &self.inner.config)
            .finish()
    }
}
