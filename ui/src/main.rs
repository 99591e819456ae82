fn main() {
    dioxus::logger::initialize_default();
    dioxus::launch(bazaar_ui::components::App);
}
