use crate::vectors::{KeyedVectors, SearchOptions, SimilarityError};
use crate::{EXCLUDE_SELF, PARALLEL_THRESHOLD, SHARD_ROWS, TOP_N};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::ws::{Message, WebSocket};
use warp::{Filter, Rejection, Reply};

#[derive(Deserialize, Serialize, Debug)]
pub struct SimilarRequest {
    pub word: String,
    pub top_n: Option<i64>,
    pub exclude_self: Option<bool>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct SimilarityRequest {
    pub a: String,
    pub b: String,
}

/// `positive` and `negative` are comma separated token lists.
#[derive(Deserialize, Serialize, Debug)]
pub struct AnalogyRequest {
    pub positive: String,
    pub negative: Option<String>,
    pub top_n: Option<i64>,
}

#[derive(Serialize)]
struct SimilarityReply<'a> {
    a: &'a str,
    b: &'a str,
    score: f32,
}

#[derive(Serialize)]
struct InfoReply {
    len: usize,
    dim: usize,
}

#[derive(Serialize)]
struct ErrorReply {
    error: String,
}

pub fn routes(
    model: Arc<KeyedVectors>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let similar_route = warp::path!("similar")
        .and(warp::get())
        .and(warp::query::<SimilarRequest>())
        .and(with_model(Arc::clone(&model)))
        .and_then(handle_similar);

    let similar_text_route = warp::path!("similar.txt")
        .and(warp::get())
        .and(warp::query::<SimilarRequest>())
        .and(with_model(Arc::clone(&model)))
        .and_then(handle_similar_text);

    let similarity_route = warp::path!("similarity")
        .and(warp::get())
        .and(warp::query::<SimilarityRequest>())
        .and(with_model(Arc::clone(&model)))
        .and_then(handle_similarity);

    let analogy_route = warp::path!("analogy")
        .and(warp::get())
        .and(warp::query::<AnalogyRequest>())
        .and(with_model(Arc::clone(&model)))
        .and_then(handle_analogy);

    let info_route = warp::path!("info")
        .and(warp::get())
        .and(with_model(Arc::clone(&model)))
        .and_then(handle_info);

    let stream_route = warp::path!("ws")
        .and(warp::ws())
        .and(warp::query::<SimilarRequest>())
        .and(with_model(model))
        .map(|ws: warp::ws::Ws, request: SimilarRequest, model| {
            ws.on_upgrade(move |socket| handle_stream(request, model, socket))
        });

    similar_route
        .or(similar_text_route)
        .or(similarity_route)
        .or(analogy_route)
        .or(info_route)
        .or(stream_route)
}

fn with_model(
    model: Arc<KeyedVectors>,
) -> impl Filter<Extract = (Arc<KeyedVectors>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&model))
}

// negative top_n means nothing to return
fn search_options(model: &KeyedVectors, top_n: Option<i64>, exclude_self: Option<bool>) -> SearchOptions {
    let top_n = top_n
        .map(|n| usize::try_from(n).unwrap_or(0))
        .unwrap_or(*TOP_N);
    let options = SearchOptions::new(top_n).exclude_self(exclude_self.unwrap_or(*EXCLUDE_SELF));
    if model.len() >= *PARALLEL_THRESHOLD {
        options.parallel(*SHARD_ROWS)
    } else {
        options
    }
}

fn split_tokens(raw: &str) -> Vec<&str> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect()
}

fn error_reply(e: SimilarityError) -> Response {
    warn!("query failed: {}", e);
    let status = match e {
        SimilarityError::UnknownToken(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    };
    warp::reply::with_status(warp::reply::json(&ErrorReply { error: e.to_string() }), status)
        .into_response()
}

async fn handle_similar(
    request: SimilarRequest,
    model: Arc<KeyedVectors>,
) -> Result<Response, Infallible> {
    info!("get similar request: {:?}", request);
    let options = search_options(&model, request.top_n, request.exclude_self);
    Ok(match model.most_similar_with(&request.word, &options) {
        Ok(list) => warp::reply::json(&list).into_response(),
        Err(e) => error_reply(e),
    })
}

async fn handle_similar_text(
    request: SimilarRequest,
    model: Arc<KeyedVectors>,
) -> Result<Response, Infallible> {
    info!("get similar.txt request: {:?}", request);
    let options = search_options(&model, request.top_n, request.exclude_self);
    Ok(match model.most_similar_with(&request.word, &options) {
        Ok(list) => list.to_string().into_response(),
        Err(e) => error_reply(e),
    })
}

async fn handle_similarity(
    request: SimilarityRequest,
    model: Arc<KeyedVectors>,
) -> Result<Response, Infallible> {
    info!("get similarity request: {:?}", request);
    Ok(match model.similarity(&request.a, &request.b) {
        Ok(score) => warp::reply::json(&SimilarityReply {
            a: &request.a,
            b: &request.b,
            score,
        })
        .into_response(),
        Err(e) => error_reply(e),
    })
}

async fn handle_analogy(
    request: AnalogyRequest,
    model: Arc<KeyedVectors>,
) -> Result<Response, Infallible> {
    info!("get analogy request: {:?}", request);
    let positive = split_tokens(&request.positive);
    let negative = request.negative.as_deref().map(split_tokens).unwrap_or_default();
    let options = search_options(&model, request.top_n, None);
    Ok(
        match model.most_similar_combination(&positive, &negative, &options) {
            Ok(list) => warp::reply::json(&list).into_response(),
            Err(e) => error_reply(e),
        },
    )
}

async fn handle_info(model: Arc<KeyedVectors>) -> Result<Response, Infallible> {
    Ok(warp::reply::json(&InfoReply {
        len: model.len(),
        dim: model.dim(),
    })
    .into_response())
}

async fn handle_stream(request: SimilarRequest, model: Arc<KeyedVectors>, ws: WebSocket) {
    info!("get stream request: {:?}", request);
    let (mut tx, _) = ws.split();

    let options = search_options(&model, request.top_n, request.exclude_self);
    let lines = match model.most_similar_with(&request.word, &options) {
        Ok(list) => list.iter().map(|similar| similar.to_string()).collect::<Vec<_>>(),
        Err(e) => {
            warn!("stream query {} failed: {}", request.word, e);
            vec![format!("error: {}", e)]
        }
    };
    for line in lines {
        if let Err(e) = tx.send(Message::text(line)).await {
            warn!("stream reply failed: {}", e);
            return;
        }
    }
    if let Err(e) = tx.close().await {
        warn!("stream close failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn model() -> Arc<KeyedVectors> {
        Arc::new(
            KeyedVectors::from_pairs(
                2,
                vec![
                    ("a", vec![1.0, 0.0]),
                    ("b", vec![0.0, 1.0]),
                    ("c", vec![1.0, 1.0]),
                ],
            )
            .unwrap(),
        )
    }

    async fn get(path: &str) -> (StatusCode, Vec<u8>) {
        let res = warp::test::request()
            .method("GET")
            .path(path)
            .reply(&routes(model()))
            .await;
        (res.status(), res.body().to_vec())
    }

    fn tokens(body: &[u8]) -> Vec<String> {
        let value: Value = serde_json::from_slice(body).unwrap();
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["token"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn similar_returns_ranked_json() {
        let (status, body) = get("/similar?word=a&top_n=3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tokens(&body), vec!["a", "c", "b"]);
    }

    #[tokio::test]
    async fn similar_can_exclude_self() {
        let (_, body) = get("/similar?word=a&top_n=3&exclude_self=true").await;
        assert_eq!(tokens(&body), vec!["c", "b"]);
    }

    #[tokio::test]
    async fn non_positive_top_n_is_empty() {
        for path in ["/similar?word=a&top_n=0", "/similar?word=a&top_n=-4"] {
            let (status, body) = get(path).await;
            assert_eq!(status, StatusCode::OK);
            assert!(tokens(&body).is_empty());
        }
    }

    #[tokio::test]
    async fn unknown_word_is_not_found() {
        let (status, body) = get("/similar?word=zebra").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({ "error": "unknown token: zebra" }));
    }

    #[tokio::test]
    async fn text_listing_has_six_decimals() {
        let (status, body) = get("/similar.txt?word=a&top_n=3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            String::from_utf8(body).unwrap(),
            "a 1.000000\nc 0.707107\nb 0.000000\n"
        );
    }

    #[tokio::test]
    async fn similarity_between_words() {
        let (status, body) = get("/similarity?a=a&b=b").await;
        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["a"], "a");
        assert_eq!(value["score"].as_f64().unwrap(), 0.0);
    }

    #[tokio::test]
    async fn analogy_excludes_its_inputs() {
        let (status, body) = get("/analogy?positive=a,%20c&top_n=5").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tokens(&body), vec!["b"]);

        let (status, _) = get("/analogy?positive=&top_n=5").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn info_reports_shape() {
        let (_, body) = get("/info").await;
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({ "len": 3, "dim": 2 }));
    }

    #[tokio::test]
    async fn missing_word_is_rejected() {
        let (status, _) = get("/similar?top_n=3").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn stream_sends_one_frame_per_result() {
        let mut client = warp::test::ws()
            .path("/ws?word=a&top_n=2")
            .handshake(routes(model()))
            .await
            .expect("handshake");
        let first = client.recv().await.unwrap();
        assert_eq!(first.to_str().unwrap(), "a 1.000000");
        let second = client.recv().await.unwrap();
        assert_eq!(second.to_str().unwrap(), "c 0.707107");
    }

    #[tokio::test]
    async fn stream_reports_unknown_word() {
        let mut client = warp::test::ws()
            .path("/ws?word=zebra")
            .handshake(routes(model()))
            .await
            .expect("handshake");
        let first = client.recv().await.unwrap();
        assert_eq!(first.to_str().unwrap(), "error: unknown token: zebra");
        match client.recv().await {
            Ok(msg) => assert!(msg.is_close(), "{:?}", msg),
            Err(_) => {}
        }
    }

    #[test]
    fn split_tokens_ignores_blanks() {
        assert_eq!(split_tokens("a, b,,c "), vec!["a", "b", "c"]);
        assert!(split_tokens("").is_empty());
    }
}
