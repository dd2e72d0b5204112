use clap::{Parser, Subcommand};
use portfolio_media::cache::RenditionCache;
use portfolio_media::catalog::{Catalog, EntityStore};
use portfolio_media::config::{self, MediaConfig};
use portfolio_media::entities::{EntityId, EntityKind, IMAGE_PURPOSES, ImageOwner};
use portfolio_media::logging::init_logging;
use portfolio_media::output::{self, FieldView};
use portfolio_media::registry::Registry;
use portfolio_media::resolver::Resolver;
use portfolio_media::storage::LocalStorage;
use portfolio_media::tags::{ImageOptions, TagBuilder};
use portfolio_media::warm;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "portfolio-media")]
#[command(about = "Responsive image renditions for a portfolio site")]
#[command(long_about = "\
Responsive image renditions for a portfolio site

Every image field on a profile, project or project render is bound to a
purpose. Each purpose names a set of renditions (thumbnails and crops)
generated on demand under the media root and served through srcset and
lazy-loading markup.

Files:

  media.toml          # Purposes, renditions, storage and logging (optional)
  catalog.json        # Profiles, projects and renders with their image paths
  media/              # media_root: uploaded originals
  └── __sized__/      # Generated derivatives, mirrors the originals' layout

Run 'portfolio-media gen-config' to generate a documented media.toml.")]
#[command(version)]
struct Cli {
    /// Media configuration file
    #[arg(long, default_value = "media.toml", global = true)]
    config: PathBuf,

    /// Entity catalog
    #[arg(long, default_value = "catalog.json", global = true)]
    catalog: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate configuration and catalog
    Check,
    /// Generate every derived rendition ahead of time
    Warm {
        /// Only warm one entity kind (Profile, Project, ProjectRender)
        #[arg(long)]
        model: Option<EntityKind>,
        /// Ignore recorded renditions and re-check storage for each one
        #[arg(long)]
        no_cache: bool,
    },
    /// Print the responsive markup for one entity's image
    Tag {
        /// Entity kind (Profile, Project, ProjectRender)
        model: EntityKind,
        /// Entity id
        id: EntityId,
        /// Rendition used for src (defaults to the largest srcset rendition)
        #[arg(long)]
        rendition: Option<String>,
        /// Emit a <picture> element with a WebP source
        #[arg(long)]
        picture: bool,
        /// Load immediately instead of lazily
        #[arg(long)]
        eager: bool,
        /// Alternative text
        #[arg(long, default_value = "")]
        alt: String,
        /// CSS class
        #[arg(long, default_value = "")]
        class: String,
    },
    /// Print srcset and sizes for each image field of one entity
    Srcset {
        /// Entity kind (Profile, Project, ProjectRender)
        model: EntityKind,
        /// Entity id
        id: EntityId,
    },
    /// Print a stock media.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let media_config = config::load_config(&cli.config)?;
    init_logging(&media_config.logging);

    let registry = Registry::from_config(&media_config)?;
    registry.require(IMAGE_PURPOSES)?;
    let registry = Arc::new(registry);
    let catalog = Catalog::load(&cli.catalog)?;
    let media_root = Path::new(&media_config.media_root);

    match cli.command {
        Command::Check => {
            output::print_check_output(&registry, Some(&catalog));
            println!("==> Configuration and catalog are valid");
        }
        Command::Warm { model, no_cache } => {
            init_thread_pool(&media_config.processing);
            let cache = if no_cache {
                RenditionCache::empty()
            } else {
                RenditionCache::load(media_root)
            };
            let resolver = build_resolver(&media_config, registry, cache);

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    output::print_warm_event(&event);
                }
            });
            let report = warm::warm(&resolver, &catalog, model, Some(tx));
            printer.join().ok();

            output::print_warm_summary(&report, &resolver.stats());
            resolver.save_cache(media_root)?;
            info!(entries = resolver.cache_len(), "rendition cache saved");
            if report.has_failures() {
                return Err("some renditions could not be generated".into());
            }
        }
        Command::Tag {
            model,
            id,
            rendition,
            picture,
            eager,
            alt,
            class,
        } => {
            let owner = find_owner(&catalog, model, id)?;
            let field = owner
                .image_fields()
                .into_iter()
                .next()
                .ok_or_else(|| format!("{model} has no image field"))?;
            let resolver = build_resolver(&media_config, registry, RenditionCache::load(media_root));

            let options = ImageOptions::new(alt).class(class).lazy(!eager);
            let builder = TagBuilder::new(&resolver);
            let markup = if picture {
                builder.picture_element(field.image, field.purpose, &options)
            } else {
                let rendition = match rendition {
                    Some(name) => name,
                    None => default_rendition(&resolver, field.purpose),
                };
                builder.responsive_image(field.image, field.purpose, &rendition, &options)
            };
            println!("{}", markup.into_string());
            resolver.save_cache(media_root)?;
        }
        Command::Srcset { model, id } => {
            let owner = find_owner(&catalog, model, id)?;
            let resolver = build_resolver(&media_config, registry, RenditionCache::load(media_root));
            let fields: Vec<FieldView> = owner
                .image_fields()
                .iter()
                .map(|field| FieldView {
                    name: field.name.to_string(),
                    purpose: field.purpose.to_string(),
                    srcset: field.srcset(&resolver),
                    sizes: field.sizes(resolver.registry()),
                })
                .collect();
            output::print_srcset_output(owner.kind(), owner.id(), &owner.label(), &fields);
            resolver.save_cache(media_root)?;
        }
        // Printed before config loading.
        Command::GenConfig => {}
    }

    Ok(())
}

fn build_resolver(
    media_config: &MediaConfig,
    registry: Arc<Registry>,
    cache: RenditionCache,
) -> Resolver<LocalStorage> {
    let storage = LocalStorage::from_config(media_config);
    Resolver::new(registry, storage, &media_config.renditions).with_cache(cache)
}

fn find_owner<'a>(
    catalog: &'a Catalog,
    model: EntityKind,
    id: EntityId,
) -> Result<&'a dyn ImageOwner, String> {
    catalog
        .owner(model, id)
        .ok_or_else(|| format!("{model} {id} not found in catalog"))
}

/// Largest srcset rendition of a purpose, else its first rendition.
fn default_rendition(resolver: &Resolver<LocalStorage>, purpose: &str) -> String {
    resolver
        .registry()
        .lookup(purpose)
        .ok()
        .and_then(|set| set.ladder().last().or_else(|| set.iter().next()))
        .map(|key| key.name.clone())
        .unwrap_or_default()
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores. The user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
