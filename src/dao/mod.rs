/// Remote dictionary lookup adapters.
pub mod lookup;
/// Persistent phrase stores.
pub mod phrase_store;
/// Static dictionary source loaded at startup.
pub mod seed;
/// Storage abstraction layer errors.
pub mod storage;
