use std::thread;
use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand::rngs::SmallRng;

use relay::communication::Communicate;

fn main() {

    // the number of elements to square, then the usual communication arguments.
    let mut args = std::env::args();
    let program = args.next().unwrap_or_default();
    let elements: u64 = args.next().and_then(|text| text.parse().ok()).unwrap_or(100);
    let args = std::iter::once(program).chain(args);

    let guards = relay::execute_from_args(args, move |comm| {

        // each participant draws its own delays.
        let mut rng = SmallRng::seed_from_u64(comm.rank().index() as u64);
        let square = move |x: u64| {
            thread::sleep(Duration::from_millis(rng.gen_range(0 .. 20)));
            x * x
        };

        let mut total = 0;
        for result in relay::map_unordered(comm, square, 0 .. elements, true).unwrap() {
            match result {
                Ok(value) => total += value,
                Err(error) => eprintln!("{}", error),
            }
        }

        if comm.is_master() {
            println!("sum of squares below {}: {}", elements, total);
        }
    });

    if let Err(error) = guards {
        eprintln!("error in computation: {}", error);
    }
}
