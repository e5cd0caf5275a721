pub mod analytics;
pub mod api;
pub mod experiments;
pub mod projects;
pub mod references;
pub mod responders;
pub mod static_files;

use rocket::routes;

pub fn get_routes() -> Vec<rocket::Route> {
    let api_routes = routes![
        // Accounts and service routes under /api/v1/
        api::health_check,
        api::setup,
        api::login,
        api::logout,
        api::whoami,
        api::create_user,
        api::get_cache_stats,
        api::clear_cache,
        // Projects and ribo uploads
        projects::list_projects,
        projects::create_project,
        projects::get_project,
        projects::update_project_description,
        projects::delete_project,
        projects::upload_ribo,
        projects::confirm_ribo,
        // Experiments
        experiments::get_experiment,
        experiments::update_experiment_description,
        experiments::update_experiment_reference,
        experiments::download_experiment,
        experiments::delete_experiment,
        // References
        references::list_references,
        references::upload_reference,
        references::record_reference,
        references::get_reference,
        references::update_reference,
        references::download_reference,
        references::get_sequence,
        references::delete_reference,
        // Analytic API read by the plots
        analytics::experiment_api,
        analytics::project_api,
    ];

    // Add static file routes (lowest priority)
    let mut all_routes = api_routes;
    all_routes.extend(static_files::get_static_routes());
    all_routes
}
