use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::{body, Body, Method, Request, Response, Server, StatusCode};
use log::{error, info};
use serde::Serialize;
use std::convert::Infallible;
use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use structopt::StructOpt;
use tokio::sync::Mutex;

use img_label::{Config, Language, Page, Prediction};

type SharedPage = Arc<Mutex<Page>>;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "img-label-http",
    about = "HTTP page labelling uploaded or linked images with a pretrained model"
)]
struct CmdArgs {
    #[structopt(long, default_value = "127.0.0.1:3000", help = "Address to listen on")]
    addr: SocketAddr,

    #[structopt(long, help = "JSON config file")]
    config: Option<PathBuf>,

    #[structopt(long, help = "Export directory of TensorFlow SavedModel")]
    model_dir: Option<PathBuf>,

    #[structopt(long, help = "Path to labels file")]
    labels: Option<PathBuf>,

    #[structopt(long, help = "Status text language (ru, en)")]
    language: Option<Language>,
}

impl CmdArgs {
    fn config(&self) -> img_label::Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;

        if let Some(dir) = &self.model_dir {
            config.model_dir = dir.clone();
        }
        if let Some(labels) = &self.labels {
            config.labels_path = labels.clone();
        }
        if let Some(language) = self.language {
            config.language = language;
        }

        Ok(config)
    }
}

#[derive(Serialize)]
struct ClassifyResponse {
    status: String,
    prediction: Option<Prediction>,
}

fn json<T: Serialize>(status: StatusCode, value: &T) -> Response<Body> {
    match serde_json::to_string(value) {
        Ok(body) => Response::builder()
            .status(status)
            .header("content-type", "application/json")
            .body(Body::from(body)),
        Err(err) => Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body(Body::from(format!("Serialization failure: '{}'", err))),
    }
    .unwrap_or_else(|_| Response::new(Body::empty()))
}

fn snapshot(page: &Page, ok: bool) -> Response<Body> {
    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    json(status, &page.snapshot())
}

async fn handle(req: Request<Body>, page: SharedPage) -> Result<Response<Body>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    info!("{} {}", method, path);

    let raw = match body::to_bytes(req.into_body()).await {
        Ok(raw) => raw,
        Err(err) => {
            return Ok(Response::builder()
                .status(StatusCode::BAD_REQUEST)
                .body(Body::from(format!("Could not read request body: '{}'", err)))
                .unwrap_or_else(|_| Response::new(Body::empty())))
        }
    };

    let response = match (method, path.as_str()) {
        (Method::GET, "/status") => {
            let page = page.lock().await;
            snapshot(&page, true)
        }
        (Method::POST, "/image") => {
            let mut page = page.lock().await;
            let ok = page.upload(raw.to_vec()).await.is_ok();
            snapshot(&page, ok)
        }
        (Method::POST, "/image/url") => {
            // An empty body is a cancelled entry; anything else is the URL as typed.
            let url = if raw.is_empty() {
                None
            } else {
                Some(String::from_utf8_lossy(&raw).into_owned())
            };

            let mut page = page.lock().await;
            let ok = page.set_url(url).await.is_ok();
            snapshot(&page, ok)
        }
        (Method::POST, "/classify") => {
            let page = page.lock().await;
            let res = page.classify().await;
            let status = if res.is_ok() {
                StatusCode::OK
            } else {
                StatusCode::BAD_REQUEST
            };

            json(
                status,
                &ClassifyResponse {
                    status: page.status_text(),
                    prediction: res.ok(),
                },
            )
        }
        _ => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::empty())
            .unwrap_or_else(|_| Response::new(Body::empty())),
    };

    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = CmdArgs::from_args();

    let config = args.config()?;
    let page = Page::new(&config);
    page.start(config.model_loader());

    let page = Arc::new(Mutex::new(page));

    // A `MakeService` that produces a `Service` to handle each connection.
    let make_service = make_service_fn(move |_conn: &AddrStream| {
        let page = Arc::clone(&page);

        let service = service_fn(move |req| handle(req, page.clone()));

        async move { Ok::<_, Infallible>(service) }
    });

    let server = Server::bind(&args.addr).serve(make_service);
    info!("Listening on http://{}", args.addr);

    if let Err(e) = server.await {
        error!("server error: {}", e);
    }

    Ok(())
}
