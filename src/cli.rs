use anyhow::{Context, Result, bail};
use secrecy::ExposeSecret;
use tracing::info;

use ctxassoc::builder::{Builder, ProvenanceOptions};
use ctxassoc::config::{Config, Identity};
use ctxassoc::filter::{ContextFilter, FilterSpec, KeyLocation, KeyRegistry};
use ctxassoc::policy::PolicyOptions;
use ctxassoc::rdf::trig::serialize_trig;
use ctxassoc::resources::CreatedResources;
use ctxassoc::signature::{EcdsaP384, SignatureOptions, generate_key_pair};
use ctxassoc::source::{Fetcher, PublishMethod, RdfSource};

use crate::flags;

/// State shared by every command of one run.
pub(crate) struct App {
    config: Config,
    fetcher: Fetcher,
    keys: KeyRegistry,
    created: CreatedResources,
}

impl App {
    pub(crate) fn new(config: Config) -> Result<App> {
        let fetcher = Fetcher::new(&config.http)?;
        let keys = KeyRegistry::from_config(&config);
        Ok(App {
            config,
            fetcher,
            keys,
            created: CreatedResources::new(),
        })
    }

    pub(crate) fn created(&self) -> &CreatedResources {
        &self.created
    }

    pub(crate) async fn run(&mut self, command: flags::CtxassocCmd) -> Result<()> {
        match command {
            flags::CtxassocCmd::Build(build) => self.build(build).await,
            flags::CtxassocCmd::Filter(filter) => self.filter(filter).await,
            flags::CtxassocCmd::Keygen(_) => {
                keygen();
                Ok(())
            }
            flags::CtxassocCmd::Repl(_) => bail!("already in the repl"),
        }
    }

    fn identity(&self, name: &str) -> Result<&Identity> {
        self.config
            .identity(name)
            .with_context(|| format!("no identity {name:?} in the configuration"))
    }

    async fn signature_options(&self, identity: &Identity) -> Result<SignatureOptions> {
        let key = identity
            .private_key
            .as_ref()
            .with_context(|| format!("identity {} has no private key", identity.web_id))?;
        let jwk = match KeyLocation::parse(key.expose_secret()) {
            KeyLocation::Inline(jwk) => jwk,
            KeyLocation::Remote(url) => self.fetcher.load_text(&url).await?,
        };
        // verifiers look the key up by webId; a key URL is the better pointer
        let verification_method = match identity.public_key.as_deref().map(KeyLocation::parse) {
            Some(KeyLocation::Remote(url)) => url,
            _ => identity.web_id.clone(),
        };
        let options =
            SignatureOptions::from_jwk(EcdsaP384, &jwk, &identity.web_id, &verification_method)?;
        Ok(options.with_timeout(self.config.signature.timeout()))
    }

    async fn build(&mut self, flags: flags::Build) -> Result<()> {
        let identity = match &flags.identity {
            Some(name) => Some(self.identity(name)?.clone()),
            None => None,
        };
        let author = identity.as_ref().map(|i| i.web_id.clone());
        let signature = match (&identity, flags.sign) {
            (Some(identity), true) => Some(self.signature_options(identity).await?),
            (None, true) => bail!("--sign needs an --identity"),
            (_, false) => None,
        };

        let mut builder = Builder::new(signature);
        builder
            .start_session(None)?
            .load_rdf(&flags.source, !flags.no_graph_origin)
            .provenance(ProvenanceOptions::new(
                Some(&flags.source),
                author.as_deref(),
            )?);
        if flags.duration.is_some() || !flags.purpose.is_empty() {
            builder.policy(PolicyOptions {
                duration: flags.duration.clone(),
                purpose: (!flags.purpose.is_empty()).then(|| flags.purpose.clone()),
                assigner: author.clone(),
                assignee: None,
            });
        }
        if flags.sign {
            builder.sign_data().sign_metadata();
        }
        let dataset = builder.commit(&self.fetcher).await?;
        let trig = serialize_trig(&dataset, flags.beautify_lists)?;

        if let Some(path) = &flags.output {
            tokio::fs::write(path, &trig)
                .await
                .with_context(|| format!("unable to write {}", path.display()))?;
            info!(target: "cli", "wrote {}", path.display());
        }
        if let Some(url) = &flags.publish {
            let method = if flags.put {
                PublishMethod::Put
            } else {
                PublishMethod::Post
            };
            let location = self.fetcher.publish(url, &trig, method).await?;
            println!("{location}");
            self.created.add(location);
        } else if flags.output.is_none() {
            println!("{trig}");
        }
        Ok(())
    }

    async fn filter(&self, flags: flags::Filter) -> Result<()> {
        let sources = if flags.sources.is_empty() {
            self.created.resources().to_vec()
        } else {
            flags.sources
        };
        if sources.is_empty() {
            bail!("no sources to filter");
        }
        let author = match flags.author {
            Some(name) => Some(
                self.config
                    .identity(&name)
                    .map(|identity| identity.web_id.clone())
                    .unwrap_or(name),
            ),
            None => None,
        };
        let spec = FilterSpec {
            sources,
            origin: flags.origin,
            author,
            purpose: flags.purpose,
            require_signature: flags.require_signature,
        };

        let filter = ContextFilter::new(EcdsaP384, self.keys.clone());
        let outcome = filter.run(&spec, &self.fetcher).await?;
        println!("{}", outcome.query);
        for record in &outcome.verifications {
            println!(
                "# source {} proof by {} over {}: {}",
                record.source, record.issuer, record.target, record.status
            );
        }
        println!("{}", outcome.trig);
        Ok(())
    }
}

fn keygen() {
    let pair = generate_key_pair();
    println!("private: {}", pair.private_jwk.expose_secret());
    println!("public:  {}", pair.public_jwk);
}
