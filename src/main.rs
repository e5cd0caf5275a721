use rocket::launch;

#[launch]
async fn rocket() -> _ {
    env_logger::init();

    ribograph::create_rocket()
}
