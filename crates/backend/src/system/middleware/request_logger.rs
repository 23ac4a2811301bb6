use axum::body::{to_bytes, Body};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

/// Число с разделителями тысяч (точками): 1234567 -> "1.234.567"
pub fn format_number(n: usize) -> String {
    let digits = n.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    grouped
}

/// Middleware для логирования HTTP запросов
///
/// Пишет в tracing: метод, путь, статус, размер ответа и длительность.
pub async fn request_logger(req: Request<Body>, next: Next) -> Response {
    let start = std::time::Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;
    let (parts, body) = response.into_parts();

    // Читаем тело ответа, чтобы узнать реальный размер
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(
                "{} {} -> {} | {}ms | body error: {}",
                method,
                path,
                parts.status.as_u16(),
                start.elapsed().as_millis(),
                e
            );
            return Response::from_parts(parts, Body::default());
        }
    };

    let status = parts.status.as_u16();
    let elapsed = start.elapsed().as_millis();
    if parts.status.is_success() {
        tracing::info!(
            "{} {} -> {} | {}ms | {} bytes",
            method,
            path,
            status,
            elapsed,
            format_number(bytes.len())
        );
    } else {
        tracing::warn!(
            "{} {} -> {} | {}ms | {} bytes",
            method,
            path,
            status,
            elapsed,
            format_number(bytes.len())
        );
    }

    Response::from_parts(parts, Body::from(bytes))
}
