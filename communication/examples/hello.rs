use relay_communication::{Communicate, Source, TagFilter};

fn main() {
    // configure from the command line, e.g. `-w 2` for two threads in one process.
    let config = relay_communication::Config::from_args(std::env::args()).unwrap();

    // initializes communication, spawns participants
    let guards = relay_communication::initialize(config, |mut comm| {
        println!("participant {} started", comm.rank());

        // greet every participant, ourselves included.
        for target in relay_communication::Rank::all(comm.size()) {
            comm.send(&format!("hello, {}", target), target, 0).unwrap();
        }

        // one greeting arrives from each participant.
        for _ in 0 .. comm.size() {
            let message = comm.receive::<String>(Source::Any, TagFilter::Exact(0)).unwrap();
            println!("participant {}: received <{}> from {}", comm.rank(), message.payload, message.source);
        }

        comm.barrier().unwrap();
        comm.rank().index()
    });

    // computation runs until guards are joined or dropped.
    if let Ok(guards) = guards {
        for guard in guards.join() {
            println!("result: {:?}", guard);
        }
    }
    else { println!("error in computation"); }
}
