use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use argh::FromArgs;
use atmos_assistant::{
    parse_answer, ChatConfig, CommandSpec, FallbackSpeaker, FreshnessGuard, GroqClient,
    LanguageService, LocalSynthesizer, Press, RemoteSpeechConfig, RemoteSynthesizer,
    SilentSpeaker, SpeechError, SpeechInput, SpeechOutput, TerminalListener, VoiceInteractions,
    VoiceOrchestrator,
};
use atmos_core::{AppError, AuthError, Config, LocationMode};
use atmos_weather::retry::{DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_DELAY_MS};
use atmos_weather::{
    weather_alerts, AlertNotifier, Coordinates, DisabledLocator, FixedLocator, IpLocator,
    LogSink, Locator, OpenWeatherProvider, ProviderConfig, RetryConfig, SharedContext,
    WeatherCache, WeatherContext, WeatherFetcher, WeatherService,
};
use chrono::Utc;
use tokio_util::sync::CancellationToken;

mod error_mapping;
mod report;

use error_mapping::IntoAppError;

/// Atmos: current weather, forecasts and a voice weather assistant.
#[derive(FromArgs)]
struct Args {
    /// config file to use instead of the default location
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Now(NowArgs),
    City(CityArgs),
    Ask(AskArgs),
    Listen(ListenArgs),
    Config(ConfigArgs),
}

/// Weather at your current location
#[derive(FromArgs)]
#[argh(subcommand, name = "now")]
struct NowArgs {
    /// ignore the cached snapshot and fetch again
    #[argh(switch, short = 'r')]
    refresh: bool,
}

/// Weather for a city
#[derive(FromArgs)]
#[argh(subcommand, name = "city")]
struct CityArgs {
    /// city name, e.g. "New York"
    #[argh(positional)]
    name: Vec<String>,
}

/// Ask the assistant one question
#[derive(FromArgs)]
#[argh(subcommand, name = "ask")]
struct AskArgs {
    /// print the raw model answer and the parsed location instead
    #[argh(switch)]
    raw: bool,

    /// don't speak the answer
    #[argh(switch, short = 's')]
    silent: bool,

    /// the question
    #[argh(positional)]
    question: Vec<String>,
}

/// Conversation mode: one question per line, Ctrl-C stops speaking
#[derive(FromArgs)]
#[argh(subcommand, name = "listen")]
struct ListenArgs {
    /// don't speak answers
    #[argh(switch, short = 's')]
    silent: bool,
}

/// Show the config file location and validate it
#[derive(FromArgs)]
#[argh(subcommand, name = "config")]
struct ConfigArgs {}

struct App {
    config: Config,
    context: SharedContext,
    service: Arc<WeatherService>,
}

impl App {
    fn build(config: Config) -> Result<Self> {
        let weather = &config.weather;
        let provider = OpenWeatherProvider::new(ProviderConfig {
            api_key: weather.api_key.clone(),
            base_url: weather.base_url.clone(),
            timeout: Duration::from_secs(weather.request_timeout_secs),
            retry: RetryConfig::new(
                weather.max_retries,
                DEFAULT_INITIAL_DELAY_MS,
                DEFAULT_MAX_DELAY_MS,
            ),
        })
        .context("Failed to create weather client")?;

        let context = SharedContext::default();
        let service = WeatherService::new(
            Arc::new(provider),
            context.clone(),
            weather.cache_duration(),
        )
        .with_locator(locator(&config)?)
        .with_cache(WeatherCache::new(&config.config_dir));

        Ok(Self {
            config,
            context,
            service: Arc::new(service),
        })
    }

    /// Load the last fresh snapshot, or fetch the current location. A failure
    /// leaves the context empty; the assistant copes with that.
    async fn warm_up(&self) {
        if let Err(e) = self.service.initialize().await {
            tracing::warn!("Starting without weather data: {}", e);
        }
    }

    fn assistant(&self) -> Result<GroqClient> {
        let assistant = &self.config.assistant;
        GroqClient::new(ChatConfig {
            enabled: assistant.enabled,
            api_key: assistant.api_key.clone(),
            base_url: assistant.base_url.clone(),
            model: assistant.chat_model.clone(),
            temperature: assistant.temperature,
            max_tokens: assistant.max_tokens,
            timeout: Duration::from_secs(assistant.request_timeout_secs),
        })
        .context("Failed to create assistant client")
    }

    fn speech(&self, silent: bool) -> Arc<dyn SpeechOutput> {
        let speech = &self.config.speech;
        if silent || !speech.enabled {
            return Arc::new(SilentSpeaker);
        }

        let local = LocalSynthesizer::new(CommandSpec::new(
            &speech.local_command,
            speech.local_args.clone(),
        ));
        let remote = RemoteSynthesizer::new(
            RemoteSpeechConfig {
                api_key: self.config.assistant.api_key.clone(),
                base_url: self.config.assistant.base_url.clone(),
                model: speech.tts_model.clone(),
                voice: speech.tts_voice.clone(),
                timeout: Duration::from_secs(self.config.assistant.request_timeout_secs),
            },
            CommandSpec::new(&speech.player_command, speech.player_args.clone()),
        );

        match remote {
            Ok(remote) => Arc::new(FallbackSpeaker::new(remote, local)),
            Err(e) => {
                tracing::warn!("Remote speech unavailable, using {}: {}", speech.local_command, e);
                Arc::new(local)
            }
        }
    }

    fn orchestrator(&self, silent: bool) -> Result<VoiceOrchestrator> {
        let guard = FreshnessGuard::new(
            self.config.weather.cache_duration(),
            self.config.assistant.skip_fetch_when_fresh,
        );
        Ok(VoiceOrchestrator::new(
            Arc::new(self.assistant()?),
            self.service.clone(),
            self.speech(silent),
            self.context.clone(),
            guard,
        ))
    }

    fn print_report(&self) {
        println!("{}", report::render(&self.context.snapshot(), Utc::now()));
    }

    async fn notify_alerts(&self, context: &WeatherContext) {
        let Some(snapshot) = context.current() else {
            return;
        };
        let notifier = AlertNotifier::new(
            LogSink::new(self.config.notifications.enabled),
            self.config.notifications.stagger(),
        );
        let delivered = notifier.notify(&weather_alerts(snapshot)).await;
        tracing::debug!("Delivered {} weather alert(s)", delivered);
    }
}

fn locator(config: &Config) -> Result<Arc<dyn Locator>> {
    let location = &config.location;
    let locator: Arc<dyn Locator> = match location.mode {
        LocationMode::Fixed => match (location.latitude, location.longitude) {
            (Some(lat), Some(lon)) => Arc::new(FixedLocator::new(Coordinates::new(lat, lon))),
            _ => anyhow::bail!("location.mode is \"fixed\" but latitude/longitude are not set"),
        },
        LocationMode::Ip => Arc::new(
            IpLocator::new(
                location.ip_lookup_url.clone(),
                Duration::from_secs(location.timeout_secs),
            )
            .context("Failed to create IP locator")?,
        ),
        LocationMode::Disabled => Arc::new(DisabledLocator),
    };
    Ok(locator)
}

/// Print the user-facing message; the details go to the log.
fn fail(error: AppError) -> ExitCode {
    tracing::error!("{}", error);
    eprintln!("{}", error.user_message());
    ExitCode::FAILURE
}

async fn cmd_now(app: &App, args: NowArgs) -> ExitCode {
    let result = if args.refresh {
        app.service
            .current_location_weather()
            .await
            .map(|_| app.context.snapshot())
    } else {
        app.service.initialize_current().await
    };

    match result {
        Ok(context) => {
            app.print_report();
            app.notify_alerts(&context).await;
            ExitCode::SUCCESS
        }
        Err(e) => fail(e.into_app_error()),
    }
}

async fn cmd_city(app: &App, args: CityArgs) -> ExitCode {
    let name = args.name.join(" ");
    match app.service.city_weather(&name).await {
        Ok(_) => {
            app.print_report();
            app.notify_alerts(&app.context.snapshot()).await;
            ExitCode::SUCCESS
        }
        Err(e) => fail(e.into_app_error()),
    }
}

async fn cmd_ask(app: &App, args: AskArgs) -> Result<ExitCode> {
    let question = args.question.join(" ");
    if question.trim().is_empty() {
        eprintln!("Ask a question, e.g. atmos ask \"Do I need an umbrella?\"");
        return Ok(ExitCode::FAILURE);
    }

    app.warm_up().await;

    if args.raw {
        let context = app.context.snapshot();
        return Ok(match app.assistant()?.ask(&question, context.current()).await {
            Ok(raw) => {
                let parsed = parse_answer(&raw);
                println!("{}\n", raw);
                println!("text:     {}", parsed.text);
                println!("location: {:?}", parsed.location);
                ExitCode::SUCCESS
            }
            Err(e) => fail(e.into_app_error()),
        });
    }

    let outcome = app
        .orchestrator(args.silent)?
        .run(&question, &CancellationToken::new())
        .await;
    println!("{}", outcome.text);
    Ok(ExitCode::SUCCESS)
}

async fn cmd_listen(app: &App, args: ListenArgs) -> Result<ExitCode> {
    app.warm_up().await;

    let orchestrator = app.orchestrator(args.silent)?;
    let listener = TerminalListener::stdin(app.config.speech.locale.clone());
    let interactions = Arc::new(VoiceInteractions::new());

    // Ctrl-C cancels the running interaction; pressed again while idle it quits.
    let quit = CancellationToken::new();
    {
        let interactions = interactions.clone();
        let quit = quit.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if interactions.state().is_active() {
                    interactions.press();
                } else {
                    quit.cancel();
                    break;
                }
            }
        });
    }

    println!("Ask about the weather. Ctrl-C stops an answer, Ctrl-D quits.");
    while !quit.is_cancelled() {
        let Press::Started(interaction) = interactions.press() else {
            continue;
        };

        print!("> ");
        let _ = std::io::stdout().flush();

        let transcript = match listener.listen(interaction.token()).await {
            Ok(transcript) => transcript,
            Err(SpeechError::Cancelled | SpeechError::Io(_)) => {
                interactions.finish(&interaction);
                break;
            }
            Err(e) => {
                interactions.finish(&interaction);
                eprintln!("{}", e.into_app_error().user_message());
                continue;
            }
        };

        interactions.mark_speaking(&interaction);
        let outcome = orchestrator.run(&transcript, interaction.token()).await;
        println!("{}", outcome.text);
        interactions.finish(&interaction);
    }

    Ok(ExitCode::SUCCESS)
}

fn cmd_config(path: Option<&PathBuf>) -> Result<ExitCode> {
    let path = path.cloned().unwrap_or_else(Config::config_path);
    println!("Config file: {}", path.display());

    let config = if path.exists() {
        Config::load_from(&path)?
    } else {
        Config::load()?
    };
    let validation = config.validate();

    for error in &validation.errors {
        println!("  error:   {}", error);
    }
    for warning in &validation.warnings {
        println!("  warning: {}", warning);
    }
    if validation.is_valid() && validation.warnings.is_empty() {
        println!("  OK");
    }

    Ok(if validation.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn run(args: Args) -> Result<ExitCode> {
    if let Command::Config(_) = args.command {
        return cmd_config(args.config.as_ref());
    }

    let config = match Config::load_validated(args.config.as_deref()) {
        Ok((config, _)) => config,
        Err(e) => return Ok(fail(e.into())),
    };
    if !config.weather.is_configured() {
        return Ok(fail(AppError::Auth(AuthError::MissingKey(
            "OpenWeather".to_string(),
        ))));
    }

    let app = App::build(config)?;
    tracing::info!("Atmos started");

    match args.command {
        Command::Now(a) => Ok(cmd_now(&app, a).await),
        Command::City(a) => Ok(cmd_city(&app, a).await),
        Command::Ask(a) => cmd_ask(&app, a).await,
        Command::Listen(a) => cmd_listen(&app, a).await,
        Command::Config(_) => Ok(ExitCode::SUCCESS),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args: Args = argh::from_env();

    if let Err(e) = atmos_core::init() {
        eprintln!("Failed to initialize logging: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
