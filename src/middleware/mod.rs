/*
 * Responsibility
 * - middleware の公開インターフェース
 * - auth::access (認証 + 認可), cors, http (request-id / trace / limit / timeout)
 */
pub mod auth;
pub mod cors;
pub mod http;
