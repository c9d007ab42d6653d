//! Reader enumeration example

use pcsckit::drivers::Acr122Driver;
use pcsckit::{DriverKind, Session, SessionConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> pcsckit::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let session = Session::open_with_config(SessionConfig::from_env()).await?;

    for group in session.list_reader_groups().await? {
        println!("{}", group);
    }

    let readers = session
        .list_readers(&[], &[DriverKind::of::<Acr122Driver>(), DriverKind::passthrough()])
        .await?;

    if readers.is_empty() {
        println!("No readers attached");
    }
    for reader in &readers {
        println!("{} -> {}", reader.name(), reader.driver());
    }

    session.close().await;
    Ok(())
}
