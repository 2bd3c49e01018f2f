//! Runs alone in its own binary, as it sets process-wide environment variables.

use relay::communication::{Error as CommunicationError, Thread};
use relay::{map_unordered, map_unordered_slice, Error, MapConfig};

#[test]
fn lone_participants_reject_launched_worlds() {
    std::env::set_var("RELAY_WORLD_SIZE", "4");

    let mut comm = Thread::new();
    let result = map_unordered(&mut comm, |x: u32| x, 0 .. 4, false).map(|results| results.count());
    match result {
        Err(Error::Communication(CommunicationError::EnvironmentMismatch { variable, size })) => {
            assert_eq!(variable, "RELAY_WORLD_SIZE");
            assert_eq!(size, 4);
        },
        other => panic!("expected an environment mismatch, found {:?}", other.map(|_| ())),
    }

    let words = ["alpha", "beta"];
    assert!(matches!(
        map_unordered_slice(&mut comm, |word: &&str| word.len(), &words[..], MapConfig::default()),
        Err(Error::Communication(CommunicationError::EnvironmentMismatch { .. }))
    ));
    assert!(relay::execute_directly(|_| ()).is_err());

    std::env::set_var("RELAY_WORLD_SIZE", "1");
    let squares = map_unordered(&mut comm, |x: u32| x * x, 0 .. 4, false)
        .unwrap()
        .map(Result::unwrap)
        .collect::<Vec<_>>();
    assert_eq!(squares, vec![0, 1, 4, 9]);
}
