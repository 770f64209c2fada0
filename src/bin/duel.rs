use kin::prelude::*;

#[derive(Component, Property, Debug, Clone)]
struct Name(String);

#[derive(Component, Property, Debug, Clone, Copy)]
struct Health(i32);

#[derive(Component, Property, Debug, Clone, Copy)]
struct Mana(i32);

/// Mana handed to casters that ran dry.
const REFILL: i32 = 1337;

#[derive(EntityAlias, Clone, Copy)]
#[alias(Name, Health, Mana)]
struct Spellcaster<'m>(Entity<'m>);

impl Spellcaster<'_> {
    fn is_oom(self) -> EcsResult<bool> {
        Ok(*self.get::<Mana>()?.value() == 0)
    }

    fn is_alive(self) -> EcsResult<bool> {
        Ok(*self.get::<Health>()?.value() > 0)
    }

    fn cast(self, target: Spellcaster<'_>) -> EcsResult<()> {
        if !self.is_oom()? {
            self.get_mut::<Mana>()?.pre_dec();
            target.get_mut::<Health>()?.pre_dec();
        }

        Ok(())
    }
}

struct CastSpell;
impl System for CastSpell {
    fn update(&mut self, entities: &EntityManager, _: f32) -> anyhow::Result<()> {
        let casters = entities.fetch_every::<Spellcaster>();
        casters.each(|caster| casters.each(|target| if caster.id() != target.id() {
            caster.cast(target)
        } else {
            Ok(())
        }))?;

        Ok(())
    }
}

struct GiveMana;
impl System for GiveMana {
    fn update(&mut self, entities: &EntityManager, _: f32) -> anyhow::Result<()> {
        entities.fetch_every::<Spellcaster>().each(|caster| {
            if caster.is_oom()? {
                log::info!("{} ran out of mana", caster.get::<Name>()?.value());
                caster.set(Mana(REFILL))?;
            }

            Ok(())
        })?;

        Ok(())
    }
}

struct RemoveCorpses;
impl System for RemoveCorpses {
    fn update(&mut self, entities: &EntityManager, _: f32) -> anyhow::Result<()> {
        entities.fetch_every::<Spellcaster>().each(|caster| {
            if !caster.is_alive()? {
                log::info!("{} has fallen", caster.get::<Name>()?.value());
                caster.destroy()?;
            }

            Ok(())
        })?;

        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let entities = EntityManager::new();
    let mut systems = SystemManager::new(&entities);
    systems.add(CastSpell)?;
    systems.add(GiveMana)?;
    systems.add(RemoveCorpses)?;

    entities.create_as::<Spellcaster>((Name("Alice".into()), Health(8), Mana(12)))?;
    entities.create_as::<Spellcaster>((Name("Bob".into()), Health(12), Mana(8)))?;

    let mut ticks = 0usize;
    while entities.count() > 1 {
        systems.update(1.)?;
        ticks += 1;
    }

    log::debug!("duel settled after {ticks} ticks");
    entities.each::<(&Name, &Health, &Mana), _>(|(name, health, mana)| {
        println!("{} won!", name.value());
        println!("Health: {}", health.value());
        println!("Mana:   {}", mana.value());
        Ok(())
    })?;

    Ok(())
}
