// Client and server must derive identical gameplay tuning from one environment.

use game_client::config::client_settings;
use game_server::frameworks::config::world_settings;

#[test]
fn client_reads_the_same_tuning_as_the_server() {
    // SAFETY: the only test in this binary.
    unsafe {
        std::env::set_var("MAX_SPEED", "3000");
        std::env::set_var("SPEED_TOLERANCE", "1.1");
        std::env::set_var("SHOOTING_INTERVAL", "0.1");
        std::env::set_var("SHOT_INITIAL_SPEED", "15000");
        std::env::set_var("SHOT_LIFESPAN", "1.5");
    }

    let client = client_settings();
    let server = world_settings();

    assert_eq!(client.pawn.max_speed, 3000.0);
    assert_eq!(client.pawn.max_speed, server.pawn.max_speed);
    assert_eq!(client.pawn.speed_limit(), server.pawn.speed_limit());
    assert_eq!(client.shots.shooting_interval, 0.1);
    assert_eq!(client.shots.shooting_interval, server.shots.shooting_interval);
    assert_eq!(client.shots.initial_speed, server.shots.initial_speed);
    assert_eq!(client.shots.lifespan, server.shots.lifespan);
}
