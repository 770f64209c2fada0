use kin_common::prelude::*;
use kin_ecs::{
    prelude::*,
    BLOCK_SIZE,
};
use std::{
    any::type_name,
    thread,
};

#[derive(Component, Debug, Default, Clone, Copy, PartialEq)]
struct Position(f32, f32);

#[derive(Component, Debug, Default, Clone, Copy, PartialEq)]
struct Velocity(f32, f32);

#[derive(Component, Property, Debug, Default, Clone, Copy)]
struct Fuel(u32);

#[derive(EntityAlias, Clone, Copy)]
#[alias(Position, Velocity, Fuel)]
struct Car<'m>(Entity<'m>);

impl Car<'_> {
    fn drive(self, dx: f32, dy: f32) -> EcsResult<()> {
        self.set(Velocity(dx, dy))?;
        self.get_mut::<Fuel>()?.pre_dec();
        Ok(())
    }
}

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn cars() -> anyhow::Result<()> {
    init();

    let entities = EntityManager::new();
    let parked = entities.create_with(Position(1., 1.))?;
    let cars = (0..4)
        .map(|i| entities.create_as::<Car>((Position(i as f32, 0.), Velocity::default(), Fuel(10))))
        .collect::<EcsResult<Vec<_>>>()?;

    // Cars share a block of their own, the lone position lives in the untyped one.
    assert_eq!(parked.id().index(), 0);
    assert_eq!(cars[0].id().index(), BLOCK_SIZE as u32);
    assert!(cars.windows(2).all(|pair| pair[1].id().index() == pair[0].id().index() + 1));

    for car in entities.fetch_every::<Car>() {
        car.drive(1., 2.)?;
    }

    entities.each::<(&mut Position, &Velocity), _>(|(mut position, velocity)| {
        position.0 += velocity.0;
        position.1 += velocity.1;
        Ok(())
    })?;

    assert_eq!(*parked.get::<Position>()?, Position(1., 1.));
    assert_eq!(*cars[3].get::<Position>()?, Position(4., 2.));
    assert!(cars.iter().all(|car| car.get::<Fuel>().map(|fuel| *fuel.value() == 9).unwrap_or(false)));

    // Losing a component demotes a car back to a plain entity.
    cars[0].remove::<Fuel>()?;
    assert!(!cars[0].is::<Car>());
    assert_eq!(entities.fetch_every::<Car>().count(), 3);
    assert_eq!(cars[0].drive(0., 0.), Err(EcsError::MissingComponent { component: type_name::<Fuel>() }));
    Ok(())
}

#[test]
fn staging() -> anyhow::Result<()> {
    init();

    let entities = EntityManager::new();
    let mut staged = entities.stage();
    staged.add(Position(3., 4.))?;
    staged.add(Fuel(1))?;
    assert_eq!(staged.add(Fuel(2)), Err(EcsError::DuplicateComponent { component: type_name::<Fuel>() }));
    assert_eq!(entities.count(), 0);

    staged.get_mut::<Fuel>()?.replace(5);
    staged.set(Velocity(0., 1.));
    assert!(staged.has::<(Position, Velocity, Fuel)>());

    let car = Entity::try_from(staged)?;
    assert_eq!(entities.count(), 1);
    assert!(car.is::<Car>());
    assert_eq!(car.get::<Fuel>()?.get(), 5);
    Ok(())
}

#[test]
fn concurrent_registration() -> anyhow::Result<()> {
    init();

    let registry = ComponentRegistry::new();
    let counts = thread::scope(|scope| {
        let handles = (0..4)
            .map(|i| {
                let registry = registry.clone();
                scope.spawn(move || -> EcsResult<usize> {
                    let entities = EntityManager::with_registry(registry);
                    for _ in 0..=i {
                        entities.create_with((Position::default(), Velocity::default()))?;
                    }

                    Ok(entities.with::<(Velocity, Position)>().count())
                })
            })
            .collect::<Vec<_>>();

        handles
            .into_iter()
            .map(|handle| -> anyhow::Result<usize> {
                let count = handle.join().map_err(|_| anyhow::anyhow!("a worker panicked"))??;
                Ok(count)
            })
            .collect::<anyhow::Result<Vec<_>>>()
    })?;

    assert_eq!(counts, [1, 2, 3, 4]);
    assert_eq!(registry.len(), 2);

    let (position, velocity) = (registry.register::<Position>(), registry.register::<Velocity>());
    assert_ne!(position, velocity);
    assert_eq!(registry.len(), 2);
    Ok(())
}
