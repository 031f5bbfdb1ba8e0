//! Identifier → player map owned by the composition root.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::config::Config;
use crate::host::SpriteHost;
use crate::ids::IdAllocator;
use crate::player::SpritePlayer;
use crate::scheduler::Scheduler;
use crate::source::{AnimationSource, ContainerAttributes};

pub struct PlayerRegistry<H: SpriteHost> {
    host: Rc<H>,
    config: Rc<Config>,
    scheduler: Scheduler,
    ids: IdAllocator,
    players: IndexMap<String, SpritePlayer<H>>,
}

impl<H: SpriteHost> PlayerRegistry<H> {
    pub fn new(host: Rc<H>, config: Config, scheduler: Scheduler) -> Self {
        Self {
            host,
            config: Rc::new(config),
            scheduler,
            ids: IdAllocator::new(),
            players: IndexMap::new(),
        }
    }

    /// Register the animation in `container`.
    ///
    /// Containers missing their identifier or base path are logged and
    /// skipped. A second container with an already registered identifier is
    /// ignored with a warning and the existing player is returned.
    pub fn register(
        &mut self,
        container: H::Container,
        attrs: &ContainerAttributes,
    ) -> Option<SpritePlayer<H>> {
        let source = match AnimationSource::from_attributes(attrs) {
            Ok(source) => source,
            Err(err) => {
                log::error!("skipping animation container: {err}");
                return None;
            }
        };

        if let Some(existing) = self.players.get(&source.id) {
            log::warn!("animation {} is already registered; ignoring duplicate", source.id);
            return Some(existing.clone());
        }

        let player = SpritePlayer::new(
            self.ids.alloc_player(),
            source,
            container,
            Rc::clone(&self.host),
            Rc::clone(&self.config),
            self.scheduler.clone(),
        );
        log::debug!("registered animation {}", player.name());
        self.players.insert(player.name().to_string(), player.clone());
        Some(player)
    }

    /// Register every `(container, attributes)` pair, returning the new players.
    pub fn discover<I>(&mut self, containers: I) -> Vec<SpritePlayer<H>>
    where
        I: IntoIterator<Item = (H::Container, ContainerAttributes)>,
    {
        let before = self.players.len();
        for (container, attrs) in containers {
            self.register(container, &attrs);
        }
        self.players.values().skip(before).cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<SpritePlayer<H>> {
        self.players.get(id).cloned()
    }

    /// Identifiers in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.players.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SpritePlayer<H>)> + '_ {
        self.players.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    #[inline]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn host(&self) -> &Rc<H> {
        &self.host
    }
}
