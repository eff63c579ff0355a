use std::error::Error;
use std::path::PathBuf;
use structopt::StructOpt;

use img_label::{Config, Language, LinePrompt, Page};

use log::{info, warn};

#[derive(StructOpt, Debug)]
#[structopt(
    name = "img-label-cli",
    about = "CLI app to label an image with a pretrained classification model"
)]
struct CmdArgs {
    #[structopt(long, help = "JSON config file")]
    config: Option<PathBuf>,

    #[structopt(long, help = "Export directory of TensorFlow SavedModel")]
    model_dir: Option<PathBuf>,

    #[structopt(long, help = "Path to labels file")]
    labels: Option<PathBuf>,

    #[structopt(long, help = "Status text language (ru, en)")]
    language: Option<Language>,

    #[structopt(long, help = "Label printed when the model returns no candidates")]
    fallback_label: Option<String>,

    #[structopt(long, help = "Print the top prediction as JSON")]
    json: bool,

    #[structopt(subcommand)]
    source: Source,
}

#[derive(StructOpt, Debug)]
enum Source {
    /// Classify a local image file
    File {
        #[structopt(parse(from_os_str))]
        path: PathBuf,
    },

    /// Classify the image at a URL; asks for it when omitted
    Url { url: Option<String> },
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
        if let Some(label) = &self.fallback_label {
            config.fallback_label = label.clone();
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = CmdArgs::from_args();

    let config = args.config()?;
    let mut page = Page::new(&config);

    let load = page.start(config.model_loader());
    eprintln!("{}", page.status_text());

    let shown = match &args.source {
        Source::File { path } => {
            let bytes = tokio::fs::read(path).await?;
            page.upload(bytes).await.map(|_| true)
        }
        Source::Url { url: Some(url) } => page.set_url(Some(url.clone())).await,
        Source::Url { url: None } => page.enter_url(&mut LinePrompt::stdio()).await,
    };

    let shown = match shown {
        Ok(shown) => shown,
        Err(err) => {
            eprintln!("{}", page.status_text());
            return Err(err.into());
        }
    };
    if !shown {
        warn!("No URL entered, nothing to classify");
        return Ok(());
    }

    let readiness = load.await?;
    info!("Model {}", readiness);
    eprintln!("{}", page.status_text());

    let prediction = match page.classify().await {
        Ok(prediction) => prediction,
        Err(err) => {
            eprintln!("{}", page.status_text());
            return Err(err.into());
        }
    };

    if args.json {
        println!("{}", serde_json::to_string(&prediction)?);
    } else {
        println!("{}", page.status_text());
    }

    Ok(())
}
