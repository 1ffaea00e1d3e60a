//! Object-Store Client Pool (C2): a shared, bounded-connection blob-storage
//! client, the super-store date-partitioned key layout, the allow-list
//! config cache, and PGP payload encryption.

pub mod allow_list;
pub mod client;
pub mod key;
pub mod pgp_key;

pub use allow_list::SuperstoreAllowList;
pub use client::ObjectStoreClient;
pub use key::superstore_key;
pub use pgp_key::PgpEncryptor;
