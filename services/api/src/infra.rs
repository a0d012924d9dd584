use async_trait::async_trait;
use job_intake::config::AppConfig;
use job_intake::error::AppError;
use job_intake::workflows::inquiry::InquiryService;
use job_intake::workflows::recruitment::{
    build_gateway, Applicant, ApplicationPipeline, ApplicationValidator, DeliveryAck,
    DeliveryError, DeliveryGateway, DeliveryStrategy, FileConstraintPolicy, FileIngestor,
    OutboundMessage, SubmissionComposer, TierKind, UploadedFile,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{error, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Stands in for the real transport when mail settings are incomplete, so the
/// service still boots and every send reports the missing setting.
pub(crate) struct UnconfiguredGateway {
    strategy: DeliveryStrategy,
    missing: DeliveryError,
}

impl UnconfiguredGateway {
    pub(crate) fn new(strategy: DeliveryStrategy, missing: DeliveryError) -> Self {
        Self { strategy, missing }
    }
}

#[async_trait]
impl DeliveryGateway for UnconfiguredGateway {
    fn strategy(&self) -> DeliveryStrategy {
        self.strategy
    }

    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryAck, DeliveryError> {
        error!(
            code = self.missing.code(),
            subject = %message.subject,
            "delivery attempted without mail configuration"
        );
        Err(self.missing.clone())
    }
}

pub(crate) struct Services {
    pub(crate) applications: Arc<ApplicationPipeline>,
    pub(crate) inquiries: Arc<InquiryService>,
}

/// Wires both forms to one gateway. Missing mail settings degrade to
/// [`UnconfiguredGateway`]; any other construction failure aborts startup.
pub(crate) fn build_services(config: &AppConfig) -> Result<Services, AppError> {
    let strategy = config.mail.strategy;
    let gateway: Arc<dyn DeliveryGateway> = match &config.mail.recipient {
        None => {
            warn!("MAIL_RECIPIENT is not set; submissions will fail with CONFIG_MISSING");
            Arc::new(UnconfiguredGateway::new(
                strategy,
                DeliveryError::ConfigMissing("MAIL_RECIPIENT"),
            ))
        }
        Some(_) => match build_gateway(&config.mail) {
            Ok(gateway) => gateway,
            Err(missing @ DeliveryError::ConfigMissing(_)) => {
                Arc::new(UnconfiguredGateway::new(strategy, missing))
            }
            Err(other) => return Err(other.into()),
        },
    };

    let recipient = config.mail.recipient.clone().unwrap_or_default();
    let intake = &config.intake;
    let applications = ApplicationPipeline::new(
        ApplicationValidator::new(intake.rules, intake.positions.clone()),
        FileIngestor::new(FileConstraintPolicy::new(intake.file_limits), intake.image),
        SubmissionComposer::new(recipient.clone()),
        gateway.clone(),
    );

    Ok(Services {
        applications: Arc::new(applications),
        inquiries: Arc::new(InquiryService::new(recipient, gateway)),
    })
}

pub(crate) fn load_applicant(path: &Path) -> Result<Applicant, AppError> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw)
        .map_err(|err| AppError::Input(format!("{}: {err}", path.display())))
}

/// Reads a file from disk as an upload, guessing its declared type from the
/// extension the way a browser would.
pub(crate) fn load_upload(path: &Path) -> Result<UploadedFile, AppError> {
    let data = std::fs::read(path)?;
    let content_type = mime_guess::from_path(path).first_or_octet_stream();
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(UploadedFile::new(name, content_type.essence_str(), data))
}

#[derive(Debug, Clone)]
pub(crate) struct CertificateArg {
    pub(crate) tier: TierKind,
    pub(crate) path: PathBuf,
}

pub(crate) fn parse_certificate_arg(raw: &str) -> Result<CertificateArg, String> {
    let (tier, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected TIER=PATH, got '{raw}'"))?;
    let tier = TierKind::from_key(tier).ok_or_else(|| {
        format!("unknown education tier '{tier}' (use 10th, intermediate, diploma or graduation)")
    })?;
    if path.trim().is_empty() {
        return Err(format!("missing file path in '{raw}'"));
    }
    Ok(CertificateArg {
        tier,
        path: PathBuf::from(path),
    })
}
