//! Catalog and passport export commands.

use sake_passport_core::{Catalog, Identity, ReadModel};
use sake_passport_web::db;
use sake_passport_web::services::rankings::decode_snapshot;
use sake_passport_web::store::{CollectionPath, PostgresRecordStore, RecordStore};

use super::{CommandError, database_url};

/// Print the bundled catalog.
pub fn catalog() -> Result<(), CommandError> {
    let yaml = serde_yaml::to_string(&Catalog::bundled())?;
    #[allow(clippy::print_stdout)]
    {
        print!("{yaml}");
    }
    Ok(())
}

/// Print one identity's passport.
pub async fn passport(namespace: &str, identity: &str) -> Result<(), CommandError> {
    let database_url = database_url()?;
    let pool = db::create_pool(&database_url).await?;
    let store = PostgresRecordStore::new(pool);

    let path = CollectionPath::rankings(namespace, Identity::new(identity));
    let model: ReadModel = decode_snapshot(store.snapshot(&path).await?)?;
    tracing::info!(path = %path, records = model.len(), "passport loaded");

    let yaml = serde_yaml::to_string(&model)?;
    #[allow(clippy::print_stdout)]
    {
        print!("{yaml}");
    }
    Ok(())
}
