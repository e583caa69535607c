use crate::bigcommerce::Credentials;
use redis::AsyncCommands;

fn cache_key(session_id: &str) -> String {
    format!("bc_credentials:{session_id}")
}

fn ttl_secs() -> u64 {
    std::env::var("SESSION_TTL_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(3600)
}

pub async fn redis_get(client: &redis::Client, session_id: &str) -> Option<Credentials> {
    let mut conn = match client.get_multiplexed_async_connection().await {
        Ok(c) => c,
        Err(_) => return None,
    };
    let s: Option<String> = conn.get(cache_key(session_id)).await.ok();
    s.and_then(|v| serde_json::from_str(&v).ok())
}

pub async fn redis_set(client: &redis::Client, session_id: &str, credentials: &Credentials) {
    if let Ok(mut conn) = client.get_multiplexed_async_connection().await
        && let Ok(json) = serde_json::to_string(credentials)
    {
        let _: Result<(), _> = conn.set_ex(cache_key(session_id), json, ttl_secs()).await;
    }
}

pub async fn redis_delete(client: &redis::Client, session_id: &str) {
    if let Ok(mut conn) = client.get_multiplexed_async_connection().await {
        let _: Result<(), _> = conn.del(cache_key(session_id)).await;
    }
}
