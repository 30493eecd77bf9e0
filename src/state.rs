/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - policy: 現在の PolicyStore スナップショット (reload 時は丸ごと差し替え)
 *   - verifier: access token 検証 (外部コラボレータ)
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::services::auth::TokenVerifier;
use crate::services::policy::PolicyHandle;

#[derive(Clone)]
pub struct AppState {
    pub policy: PolicyHandle,
    pub verifier: Arc<dyn TokenVerifier>,
}

impl AppState {
    pub fn new(policy: PolicyHandle, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self { policy, verifier }
    }
}
