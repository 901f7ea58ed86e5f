use ngannotate::{Options, annotate};

fn run(src: &str, add: bool, remove: bool) -> String {
    let options = Options {
        add,
        remove,
        ..Options::default()
    };
    annotate(src, options).unwrap().src
}

fn add(src: &str) -> String {
    run(src, true, false)
}

#[test]
fn module_controller_function_is_wrapped() {
    let src = r#"angular.module("MyMod").controller("MyCtrl", function($scope, $timeout) {
});
"#;
    let expected = r#"angular.module("MyMod").controller("MyCtrl", ["$scope", "$timeout", function($scope, $timeout) {
}]);
"#;
    assert_eq!(add(src), expected);
}

#[test]
fn marked_function_declaration_gets_inject_statement() {
    let src = r#"/*@ngInject*/
function Foo($scope, $timeout) {
}
"#;
    let expected = r#"/*@ngInject*/
function Foo($scope, $timeout) {
}
Foo.$inject = ["$scope", "$timeout"];
"#;
    assert_eq!(add(src), expected);
}

#[test]
fn default_receiver_pattern_matches_plain_names() {
    let src = r#"myMod.directive("pleasematchthis", function(a) {
});
foobar.irrespective("dontmatchthis", function(b) {
});
"#;
    let expected = r#"myMod.directive("pleasematchthis", ["a", function(a) {
}]);
foobar.irrespective("dontmatchthis", function(b) {
});
"#;
    assert_eq!(add(src), expected);
}

#[test]
fn functions_without_parameters_are_untouched() {
    let src = r#"angular.module("MyMod").service("MySvc", function() {
});
"#;
    assert_eq!(add(src), src);
}

#[test]
fn add_leaves_existing_arrays_untouched() {
    let src = r#"angular.module("MyMod").controller("MyCtrl", ["$scope", function($scope) {
}]);
"#;
    assert_eq!(add(src), src);
}

#[test]
fn chained_registrations_all_match() {
    let src = r#"angular.module("MyMod").filter("f", function(a) {
}).factory("g", function(b) {
});
"#;
    let expected = r#"angular.module("MyMod").filter("f", ["a", function(a) {
}]).factory("g", ["b", function(b) {
}]);
"#;
    assert_eq!(add(src), expected);
}

#[test]
fn config_and_run_take_the_function_directly() {
    let src = r#"angular.module("MyMod").config(function($httpProvider) {
}).run(function($rootScope) {
});
"#;
    let expected = r#"angular.module("MyMod").config(["$httpProvider", function($httpProvider) {
}]).run(["$rootScope", function($rootScope) {
}]);
"#;
    assert_eq!(add(src), expected);
}

#[test]
fn component_controller_is_annotated() {
    let src = r#"angular.module("MyMod").component("myComp", {
    controller: function($scope) {
    }
});
"#;
    let expected = r#"angular.module("MyMod").component("myComp", {
    controller: ["$scope", function($scope) {
    }]
});
"#;
    assert_eq!(add(src), expected);
}

#[test]
fn var_bound_function_registered_by_reference_gets_inject_statement() {
    let src = r#"var MyCtrl = function($scope) {
};
angular.module("MyMod").controller("MyCtrl", MyCtrl);
"#;
    let expected = r#"var MyCtrl = function($scope) {
};
MyCtrl.$inject = ["$scope"];
angular.module("MyMod").controller("MyCtrl", MyCtrl);
"#;
    assert_eq!(add(src), expected);
}

#[test]
fn directive_return_object_controller_is_annotated() {
    let src = r#"angular.module("MyMod").directive("myDir", function() {
    return {
        controller: function($scope) {
        }
    };
});
"#;
    let expected = r#"angular.module("MyMod").directive("myDir", function() {
    return {
        controller: ["$scope", function($scope) {
        }]
    };
});
"#;
    assert_eq!(add(src), expected);
}

#[test]
fn directive_factory_and_returned_controller_annotate_independently() {
    let src = r#"angular.module("MyMod").directive("myDir", function($compile) {
    return {
        controller: function($scope, $timeout) {
        }
    };
});
"#;
    let expected = r#"angular.module("MyMod").directive("myDir", ["$compile", function($compile) {
    return {
        controller: ["$scope", "$timeout", function($scope, $timeout) {
        }]
    };
}]);
"#;
    assert_eq!(add(src), expected);
}

#[test]
fn provider_get_assignment_is_annotated() {
    let src = r#"angular.module("MyMod").provider("MySvc", function() {
    this.$get = function($http) {
    };
});
"#;
    let expected = r#"angular.module("MyMod").provider("MySvc", function() {
    this.$get = ["$http", function($http) {
    }];
});
"#;
    assert_eq!(add(src), expected);
}

#[test]
fn single_quotes_option_renders_single_quoted_strings() {
    let src = r#"angular.module("MyMod").controller("MyCtrl", function($scope) {
});
"#;
    let options = Options {
        add: true,
        single_quotes: true,
        ..Options::default()
    };
    let out = annotate(src, options).unwrap().src;
    assert!(out.contains("['$scope', function($scope) {"));
}
