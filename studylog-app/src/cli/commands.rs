use crate::api::server as api_server;
use crate::cli::opts::{Cli, Command, StoreKind};

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use studylog_core::store::memory::MemoryStore;
use studylog_core::{ReviewStore, StoredCard};
use studylog_sqlite::SqliteStore;
use uuid::Uuid;

pub async fn run_cli(args: Cli) -> Result<()> {
    match args.cmd.clone() {
        Command::Serve(serve) => {
            let store = open_store(&args.store, &args.db_path).await?;
            let addr: std::net::SocketAddr = serve.addr.parse()?;
            api_server::run(store, addr).await
        }
        Command::SeedCard(seed) => {
            // A memory store dies with the process; seeding only makes sense
            // against sqlite.
            let user_id: Uuid = seed.user_id.parse()?;
            let store = SqliteStore::open_file(&args.db_path).await?;
            let card = StoredCard::new(user_id);
            store.insert_card(&card).await?;
            println!("{}", card.id);
            Ok(())
        }
    }
}

pub async fn open_store(kind: &StoreKind, db_path: &Path) -> Result<Arc<dyn ReviewStore>> {
    match kind {
        StoreKind::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreKind::Sqlite => Ok(Arc::new(SqliteStore::open_file(db_path).await?)),
    }
}
