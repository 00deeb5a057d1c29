//! TransformerFactory - construct wired receiver/publisher pairs.

use std::sync::Arc;

use contracts::{Communicator, TransformError, TransformerConfig};
use tracing::{info, instrument};
use transform_core::TransformerCore;

use crate::{TransformPublisher, TransformReceiver};

/// Builds transformer instances over an arbitrary communicator
///
/// The factory owns the wiring order: the ingestion callback is registered
/// before the transport starts, so no early arrival is dropped.
pub struct TransformerFactory;

impl TransformerFactory {
    /// Create a connected receiver/publisher pair sharing one core.
    ///
    /// Must be called inside a tokio runtime; the core spawns its request
    /// scheduler worker on construction.
    #[instrument(name = "factory_create", skip(config, comm), fields(comm = comm.name()))]
    pub fn create(
        config: TransformerConfig,
        comm: Arc<dyn Communicator>,
    ) -> Result<(TransformReceiver, TransformPublisher), TransformError> {
        let authority = config
            .authority
            .clone()
            .unwrap_or_else(|| "framelink".to_string());

        let core = TransformerCore::new(config);

        let ingest_core = Arc::clone(&core);
        comm.listen(Arc::new(move |transform| {
            ingest_core.ingest(transform);
        }));
        comm.start()?;

        info!(authority = %authority, comm = comm.name(), "transformer instance created");

        let receiver = TransformReceiver::new(core, Arc::clone(&comm));
        let publisher = TransformPublisher::new(comm, authority);
        Ok((receiver, publisher))
    }

    /// Create a receive-only instance.
    pub fn create_receiver(
        config: TransformerConfig,
        comm: Arc<dyn Communicator>,
    ) -> Result<TransformReceiver, TransformError> {
        let (receiver, _publisher) = Self::create(config, comm)?;
        Ok(receiver)
    }
}
