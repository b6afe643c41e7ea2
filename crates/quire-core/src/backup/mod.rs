//! Backup integrity: structural validation, HMAC signatures, and
//! export/import of note sets.

mod export;
mod integrity;
mod validator;

pub use export::{export_plaintext, export_protected, export_protected_note, import, ImportKeys};
pub use integrity::{sign, verify, Verification, DEFAULT_VERSION};
pub use validator::{
    validate_decrypted, validate_structure, DecryptedKind, FORMAT_ENCRYPTED,
    FORMAT_PASSWORD_PROTECTED, FORMAT_PLAINTEXT, TYPE_PROTECTED_NOTE, TYPE_SINGLE_NOTE,
};
