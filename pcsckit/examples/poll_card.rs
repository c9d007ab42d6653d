//! Card polling example
//!
//! Waits for a card on the first reader, prints its ATR and UID, then
//! waits for it to be taken away. Ctrl-C stops polling early.

use pcsckit::{CancelToken, GenericCard, Picc, Session, SessionConfig, TransceiveMode};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> pcsckit::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let session = Session::open_with_config(SessionConfig::from_env()).await?;
    let timeout = session.config().default_timeout();

    let Some(reader) = session.list_readers(&[], &[]).await?.into_iter().next() else {
        println!("No readers attached");
        return Ok(());
    };

    let cancel = CancelToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    println!("Present a card to {} ({:?})...", reader.name(), timeout);
    let Some(card) = reader.poll_with::<GenericCard>(timeout, &cancel).await? else {
        println!("No card");
        return Ok(());
    };

    println!("ATR: {}", hex::encode_upper(card.atr()));

    // GET DATA, UID
    if let Some(uid) = card
        .transmit(&[0xFF, 0xCA, 0x00, 0x00, 0x00], TransceiveMode::Raw)
        .await?
    {
        println!("UID: {}", hex::encode_upper(&uid));
    }

    card.into_unit().close().await;

    if reader.wait_for_removal_with(timeout, &cancel).await? {
        println!("Card removed");
    }

    session.close().await;
    Ok(())
}
