/*
 * Responsibility
 * - Handler から見える「認証・認可済みコンテキスト」の型
 * - access middleware が token 検証と認可判定を終えた後に request extensions に格納する
 *
 * Notes
 * - permit-all path では middleware が token を見ないため、AuthCtx は存在しない
 */

use crate::services::auth::Authorities;

/// 認可済みのリクエストに付与されるコンテキスト
///
/// - `subject` は token の `sub` (service account 等では無い場合もある)
/// - `authorities` は `ROLE_` 付きの権限集合 (判定に使ったものと同一)
#[derive(Debug, Clone)]
pub struct AuthCtx {
    pub subject: Option<String>,
    pub authorities: Authorities,
}

impl AuthCtx {
    pub fn new(subject: Option<String>, authorities: Authorities) -> Self {
        Self {
            subject,
            authorities,
        }
    }
}
