// src/services/mod.rs

pub mod consumption_service;
pub mod document_service;
pub mod finance_service;
pub mod inventory_service;
pub mod transfer_service;

// Orçamento de retry dos workflows para TransactionAborted (falha de
// serialização / deadlock). Qualquer outro erro sobe na primeira tentativa.
pub(crate) const MAX_COMMIT_ATTEMPTS: u32 = 3;
